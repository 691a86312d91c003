//! Concrete storage adapters: a filesystem `StoragePort` and key providers
//! that keep the vault keypair across restarts.

pub mod file_store;
pub mod key_provider;
mod atomic;
