//! Asymmetric encryption for the vault.
//!
//! `KeyManager` owns one RSA-2048 keypair for its whole lifetime.
//! `BlockCipherEngine` borrows it to encrypt payloads of any length by cutting
//! them into PKCS#1 v1.5 sized blocks.

pub mod cipher;
pub mod error;
pub mod keys;

pub use cipher::{ciphertext_len, BlockCipherEngine};
pub use error::{CryptoError, CryptoResult};
pub use keys::{KeyManager, PublicKeyHandle, KEY_BITS, PADDING_OVERHEAD};
