use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use strongbox_crypto::{CryptoError, KeyManager};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::atomic::{read_optional, write_new};

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("keyring error: {0}")]
    Keyring(String),
    #[error("key file error: {0}")]
    Io(String),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("generation error: {0}")]
    Generation(String),
}

/// Supplies the vault keypair, creating and persisting it on first use.
#[async_trait]
pub trait KeyProvider: Send + Sync {
    async fn get_or_create(&self) -> Result<Arc<KeyManager>, KeyError>;
}

/// Keeps the PKCS#8 PEM private key in a file readable only by the owner.
pub struct FileKeyProvider {
    path: PathBuf,
}

impl FileKeyProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FileKeyProvider {
    fn load(&self) -> Result<Option<Arc<KeyManager>>, KeyError> {
        let Some(bytes) = read_optional(&self.path).map_err(|e| KeyError::Io(e.to_string()))? else {
            return Ok(None);
        };
        let pem = String::from_utf8(bytes).map_err(|e| KeyError::Io(e.to_string()))?;
        Ok(Some(Arc::new(KeyManager::from_private_pem(&pem)?)))
    }
}

#[async_trait]
impl KeyProvider for FileKeyProvider {
    /// The first writer wins: a caller that loses the race to create the key
    /// file adopts the keypair already on disk instead of its own.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    async fn get_or_create(&self) -> Result<Arc<KeyManager>, KeyError> {
        if let Some(keys) = self.load()? {
            return Ok(keys);
        }

        let keys = generate().await?;
        let pem = keys.export_private()?;
        let created =
            write_new(&self.path, pem.as_bytes(), true).map_err(|e| KeyError::Io(e.to_string()))?;
        if !created {
            debug!("key file appeared concurrently; using it");
            return self.load()?.ok_or_else(|| {
                KeyError::Io(format!("{} vanished after creation", self.path.display()))
            });
        }
        let fingerprint = keys.fingerprint()?;
        info!(%fingerprint, "created vault keypair");
        Ok(keys)
    }
}

/// OS keyring-backed provider. Uses the `keyring` crate to store the key.
pub struct KeyringProvider {
    service: String,
    account: String,
}

impl KeyringProvider {
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }
}

#[async_trait]
impl KeyProvider for KeyringProvider {
    async fn get_or_create(&self) -> Result<Arc<KeyManager>, KeyError> {
        // Keyring operations are synchronous; wrap in async for trait compatibility.
        let entry = keyring::Entry::new(&self.service, &self.account)
            .map_err(|e| KeyError::Keyring(e.to_string()))?;

        match entry.get_password() {
            Ok(pem) => Ok(Arc::new(KeyManager::from_private_pem(&pem)?)),
            Err(keyring::Error::NoEntry) => {
                let keys = generate().await?;
                entry
                    .set_password(&keys.export_private()?)
                    .map_err(|e| KeyError::Keyring(e.to_string()))?;
                let fingerprint = keys.fingerprint()?;
                info!(%fingerprint, "created vault keypair in keyring");
                Ok(keys)
            }
            Err(err) => Err(KeyError::Keyring(err.to_string())),
        }
    }
}

/// In-memory key provider for tests and ephemeral sessions.
#[derive(Debug, Default, Clone)]
pub struct InMemoryKeyProvider {
    inner: Arc<Mutex<Option<Arc<KeyManager>>>>,
}

#[async_trait]
impl KeyProvider for InMemoryKeyProvider {
    async fn get_or_create(&self) -> Result<Arc<KeyManager>, KeyError> {
        let existing = self.lock()?.clone();
        if let Some(existing) = existing {
            return Ok(existing);
        }

        let keys = generate().await?;
        let mut guard = self.lock()?;
        // Another caller may have won the race while we were generating.
        Ok(guard.get_or_insert(keys).clone())
    }
}

impl InMemoryKeyProvider {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<Arc<KeyManager>>>, KeyError> {
        self.inner
            .lock()
            .map_err(|err| KeyError::Generation(format!("lock poisoned: {err}")))
    }
}

/// RSA generation is CPU bound; keep it off the async workers.
async fn generate() -> Result<Arc<KeyManager>, KeyError> {
    let keys = tokio::task::spawn_blocking(KeyManager::generate)
        .await
        .map_err(|e| KeyError::Generation(e.to_string()))??;
    Ok(Arc::new(keys))
}
