use strongbox_core::storage::StorageError;
use strongbox_crypto::CryptoError;
use thiserror::Error;

pub type VaultResult<T> = Result<T, VaultError>;

#[derive(Debug, Error)]
pub enum VaultError {
    /// Encryption or decryption failed; never retried.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The requester does not own the record.
    #[error("access denied: {requester} does not own {storage_key}")]
    AccessDenied {
        storage_key: String,
        requester: String,
    },

    /// Blob or record is gone.
    #[error("not found: {key}")]
    NotFound { key: String },

    /// Backend failure surfaced from the storage port.
    #[error("storage failure: {reason}")]
    Storage { reason: String },

    /// Writing plaintext to the caller's sink failed.
    #[error("output failure: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for VaultError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { key } => VaultError::NotFound { key },
            StorageError::Storage { reason } => VaultError::Storage { reason },
        }
    }
}
