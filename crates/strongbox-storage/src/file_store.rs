use std::{
    fs,
    path::PathBuf,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use strongbox_core::{
    record::{sort_newest_first, SecureFileRecord},
    storage::{StorageError, StoragePort},
};
use tracing::{debug, instrument};

use crate::atomic::{read_optional, write_atomic};

const BLOB_DIR: &str = "blobs";
const RECORDS_FILE: &str = "records.json";

/// Filesystem-backed storage port.
///
/// Layout under `root`:
/// - `blobs/<base64url(storage_key)>`: raw ciphertext
/// - `records.json`: every metadata record as one JSON array
///
/// Ciphertext arrives already encrypted; this type never sees keys.
pub struct FileStoragePort {
    root: PathBuf,
    records_lock: Mutex<()>,
}

impl FileStoragePort {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            records_lock: Mutex::new(()),
        }
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.root.join(BLOB_DIR).join(sanitize_key(key))
    }

    fn records_path(&self) -> PathBuf {
        self.root.join(RECORDS_FILE)
    }

    fn lock_records(&self) -> Result<MutexGuard<'_, ()>, StorageError> {
        self.records_lock.lock().map_err(|err| StorageError::Storage {
            reason: format!("lock poisoned: {err}"),
        })
    }

    fn load_records(&self) -> Result<Vec<SecureFileRecord>, StorageError> {
        match read_optional(&self.records_path()).map_err(storage_err)? {
            Some(bytes) if !bytes.is_empty() => serde_json::from_slice(&bytes).map_err(|e| {
                StorageError::Storage {
                    reason: format!("corrupt metadata file: {e}"),
                }
            }),
            _ => Ok(Vec::new()),
        }
    }

    fn save_records(&self, records: &[SecureFileRecord]) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(records).map_err(storage_err)?;
        write_atomic(&self.records_path(), &json, true).map_err(storage_err)
    }
}

#[async_trait]
impl StoragePort for FileStoragePort {
    #[instrument(skip_all, fields(key = %key, len = bytes.len()))]
    async fn put_blob(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        write_atomic(&self.blob_path(key), bytes, true).map_err(storage_err)
    }

    #[instrument(skip_all, fields(key = %key))]
    async fn get_blob(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        read_optional(&self.blob_path(key))
            .map_err(storage_err)?
            .ok_or_else(|| StorageError::NotFound {
                key: key.to_string(),
            })
    }

    #[instrument(skip_all, fields(key = %key))]
    async fn delete_blob(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.blob_path(key)) {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(storage_err(err)),
        }
    }

    #[instrument(skip_all, fields(key = %record.storage_key))]
    async fn put_record(&self, record: &SecureFileRecord) -> Result<(), StorageError> {
        let _guard = self.lock_records()?;
        let mut records = self.load_records()?;
        if records.iter().any(|r| r.storage_key == record.storage_key) {
            return Err(StorageError::Storage {
                reason: format!("duplicate storage key: {}", record.storage_key),
            });
        }
        records.push(record.clone());
        self.save_records(&records)?;
        debug!(total = records.len(), "record saved");
        Ok(())
    }

    #[instrument(skip_all, fields(owner = %owner_id))]
    async fn list_records(&self, owner_id: &str) -> Result<Vec<SecureFileRecord>, StorageError> {
        let _guard = self.lock_records()?;
        let mut records: Vec<_> = self
            .load_records()?
            .into_iter()
            .filter(|r| r.is_owned_by(owner_id))
            .collect();
        sort_newest_first(&mut records);
        Ok(records)
    }

    #[instrument(skip_all, fields(key = %storage_key, owner = %owner_id))]
    async fn delete_record(&self, storage_key: &str, owner_id: &str) -> Result<(), StorageError> {
        let _guard = self.lock_records()?;
        let mut records = self.load_records()?;
        let position = records
            .iter()
            .position(|r| r.storage_key == storage_key && r.is_owned_by(owner_id))
            .ok_or_else(|| StorageError::NotFound {
                key: storage_key.to_string(),
            })?;
        records.remove(position);
        self.save_records(&records)
    }
}

fn sanitize_key(key: &str) -> String {
    URL_SAFE_NO_PAD.encode(key)
}

fn storage_err<E: ToString>(err: E) -> StorageError {
    StorageError::Storage {
        reason: err.to_string(),
    }
}
