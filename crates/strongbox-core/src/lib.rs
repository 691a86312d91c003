//! Core contracts for Strongbox: the storage port, file records, and the auth port.
//! This crate is intentionally small to keep dependency surface minimal.

pub mod auth;
pub mod record;
pub mod storage;
