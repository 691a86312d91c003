use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;

use super::port::{StorageError, StoragePort};
use crate::record::{sort_newest_first, SecureFileRecord};

/// In-memory storage port for tests and smoke runs. Nothing survives the process.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStoragePort {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    blobs: BTreeMap<String, Vec<u8>>,
    records: BTreeMap<String, SecureFileRecord>,
}

impl InMemoryStoragePort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs, used to detect orphans in tests.
    pub fn blob_count(&self) -> usize {
        self.lock().map(|inner| inner.blobs.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StorageError> {
        self.inner.lock().map_err(|err| StorageError::Storage {
            reason: format!("lock poisoned: {err}"),
        })
    }
}

#[async_trait]
impl StoragePort for InMemoryStoragePort {
    async fn put_blob(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.lock()?.blobs.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn get_blob(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.lock()?
            .blobs
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                key: key.to_string(),
            })
    }

    async fn delete_blob(&self, key: &str) -> Result<(), StorageError> {
        self.lock()?.blobs.remove(key);
        Ok(())
    }

    async fn put_record(&self, record: &SecureFileRecord) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        if inner.records.contains_key(&record.storage_key) {
            return Err(StorageError::Storage {
                reason: format!("duplicate storage key: {}", record.storage_key),
            });
        }
        inner
            .records
            .insert(record.storage_key.clone(), record.clone());
        Ok(())
    }

    async fn list_records(&self, owner_id: &str) -> Result<Vec<SecureFileRecord>, StorageError> {
        let mut records: Vec<_> = self
            .lock()?
            .records
            .values()
            .filter(|r| r.is_owned_by(owner_id))
            .cloned()
            .collect();
        sort_newest_first(&mut records);
        Ok(records)
    }

    async fn delete_record(&self, storage_key: &str, owner_id: &str) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        let owned = inner
            .records
            .get(storage_key)
            .is_some_and(|r| r.is_owned_by(owner_id));
        if !owned {
            return Err(StorageError::NotFound {
                key: storage_key.to_string(),
            });
        }
        inner.records.remove(storage_key);
        Ok(())
    }
}
