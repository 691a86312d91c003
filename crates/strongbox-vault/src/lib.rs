//! Owner-scoped encrypted file vault over a pluggable `StoragePort`.

mod error;

use std::{io::Write, sync::Arc};

use strongbox_core::{
    record::{sort_newest_first, SecureFileRecord},
    storage::StoragePort,
};
use strongbox_crypto::BlockCipherEngine;
use tracing::{debug, info, instrument, warn};

pub use error::{VaultError, VaultResult};

/// Encrypt-then-persist and fetch-then-decrypt, with ownership checks.
pub struct VaultStore<S: StoragePort> {
    port: Arc<S>,
    engine: BlockCipherEngine,
}

impl<S: StoragePort> Clone for VaultStore<S> {
    fn clone(&self) -> Self {
        Self {
            port: Arc::clone(&self.port),
            engine: self.engine.clone(),
        }
    }
}

impl<S: StoragePort> VaultStore<S> {
    pub fn new(port: S, engine: BlockCipherEngine) -> Self {
        Self::from_shared(Arc::new(port), engine)
    }

    pub fn from_shared(port: Arc<S>, engine: BlockCipherEngine) -> Self {
        Self { port, engine }
    }

    /// Encrypts `plaintext` and stores it for `owner_id`.
    ///
    /// The blob is written before the record. If the record write fails the
    /// blob is removed again, so no record ever points at a missing blob and
    /// no blob outlives a failed store.
    #[instrument(skip_all, fields(owner = %owner_id, len = plaintext.len()))]
    pub async fn store(
        &self,
        plaintext: &[u8],
        owner_id: &str,
        display_name: &str,
    ) -> VaultResult<SecureFileRecord> {
        let ciphertext = self.engine.encrypt_bulk(plaintext)?;
        let record = SecureFileRecord::new(display_name, owner_id, plaintext.len() as u64);

        self.port.put_blob(&record.storage_key, &ciphertext).await?;
        if let Err(err) = self.port.put_record(&record).await {
            if let Err(cleanup) = self.port.delete_blob(&record.storage_key).await {
                warn!(key = %record.storage_key, %cleanup, "failed to remove orphaned blob");
            }
            return Err(err.into());
        }

        info!(key = %record.storage_key, cipher_len = ciphertext.len(), "stored file");
        Ok(record)
    }

    /// Records owned by `owner_id`, newest first.
    #[instrument(skip_all, fields(owner = %owner_id))]
    pub async fn list_for(&self, owner_id: &str) -> VaultResult<Vec<SecureFileRecord>> {
        let mut records = self.port.list_records(owner_id).await?;
        records.retain(|r| r.is_owned_by(owner_id));
        sort_newest_first(&mut records);
        Ok(records)
    }

    /// Looks up one of `owner_id`'s records by storage key.
    pub async fn find(&self, owner_id: &str, storage_key: &str) -> VaultResult<SecureFileRecord> {
        self.list_for(owner_id)
            .await?
            .into_iter()
            .find(|r| r.storage_key == storage_key)
            .ok_or_else(|| VaultError::NotFound {
                key: storage_key.to_string(),
            })
    }

    /// Decrypts a record for its owner and returns the plaintext.
    #[instrument(skip_all, fields(key = %record.storage_key, requester = %requester))]
    pub async fn open(&self, record: &SecureFileRecord, requester: &str) -> VaultResult<Vec<u8>> {
        authorize(record, requester)?;
        let ciphertext = self.port.get_blob(&record.storage_key).await?;
        let plaintext = self.engine.decrypt_bulk(&ciphertext)?;
        debug!(len = plaintext.len(), "opened file");
        Ok(plaintext)
    }

    /// Decrypts a record and writes the plaintext to `sink`.
    ///
    /// Nothing is written unless the whole payload decrypted.
    pub async fn retrieve<W: Write + ?Sized>(
        &self,
        record: &SecureFileRecord,
        requester: &str,
        sink: &mut W,
    ) -> VaultResult<()> {
        let plaintext = self.open(record, requester).await?;
        sink.write_all(&plaintext)?;
        sink.flush()?;
        Ok(())
    }

    /// Removes a record and its blob.
    ///
    /// The blob goes first: if the process dies in between, the leftover
    /// record reports `NotFound` on the next retrieve.
    #[instrument(skip_all, fields(key = %record.storage_key, requester = %requester))]
    pub async fn delete(&self, record: &SecureFileRecord, requester: &str) -> VaultResult<()> {
        authorize(record, requester)?;
        self.port.delete_blob(&record.storage_key).await?;
        self.port
            .delete_record(&record.storage_key, &record.owner_id)
            .await?;
        info!("deleted file");
        Ok(())
    }
}

fn authorize(record: &SecureFileRecord, requester: &str) -> VaultResult<()> {
    if record.is_owned_by(requester) {
        return Ok(());
    }
    warn!(key = %record.storage_key, %requester, "ownership check failed");
    Err(VaultError::AccessDenied {
        storage_key: record.storage_key.clone(),
        requester: requester.to_string(),
    })
}
