//! Local accounts: salted Argon2id password hashes and login sessions that
//! feed the vault its owner identity.

pub mod hash;
pub mod session;
pub mod store;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("invalid username: {0}")]
    InvalidUsername(String),
    #[error("password must not be empty")]
    EmptyPassword,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("credential store failure: {0}")]
    Store(String),
}

pub use hash::HashParams;
pub use session::Session;
pub use store::{CredentialStore, FileCredentialStore, InMemoryCredentialStore};
