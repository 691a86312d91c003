use async_trait::async_trait;
use thiserror::Error;

use crate::record::SecureFileRecord;

/// Errors produced by storage port implementations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    /// Requested blob or record does not exist.
    #[error("entry not found for key: {key}")]
    NotFound { key: String },
    /// Underlying storage failure.
    #[error("storage failure: {reason}")]
    Storage { reason: String },
}

/// Durable home for encrypted blobs and their metadata records.
///
/// Implementations only move bytes; they never see plaintext and never decide
/// who may read a record.
#[async_trait]
pub trait StoragePort: Send + Sync {
    /// Persist ciphertext under a storage key.
    async fn put_blob(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Fetch ciphertext; `NotFound` when the key is unknown.
    async fn get_blob(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Remove a blob (idempotent).
    async fn delete_blob(&self, key: &str) -> Result<(), StorageError>;

    /// Persist a metadata record. Storage keys must be unique.
    async fn put_record(&self, record: &SecureFileRecord) -> Result<(), StorageError>;

    /// All records belonging to `owner_id`.
    async fn list_records(&self, owner_id: &str) -> Result<Vec<SecureFileRecord>, StorageError>;

    /// Remove the record with this key if it belongs to `owner_id`.
    async fn delete_record(&self, storage_key: &str, owner_id: &str) -> Result<(), StorageError>;
}
