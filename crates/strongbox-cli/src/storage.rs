use std::{path::PathBuf, sync::Arc};

use crate::config::{Config, KeySource};
use color_eyre::Result;
use dirs::data_dir;
use strongbox_accounts::FileCredentialStore;
use strongbox_crypto::{BlockCipherEngine, KeyManager};
use strongbox_storage::{
    file_store::FileStoragePort,
    key_provider::{FileKeyProvider, KeyProvider, KeyringProvider},
};
use strongbox_vault::VaultStore;
use tracing::debug;

const KEYRING_SERVICE: &str = "strongbox";
const KEYRING_ACCOUNT: &str = "vault-key";

/// Resolve the default data directory for Strongbox.
pub fn default_data_dir() -> Result<PathBuf> {
    let base = data_dir().ok_or_else(|| color_eyre::eyre::eyre!("no data dir available"))?;
    Ok(base.join("strongbox"))
}

/// Data directory after config overrides.
pub fn resolve_data_dir(config: &Config) -> Result<PathBuf> {
    match &config.data_dir {
        Some(root) => Ok(root.clone()),
        None => default_data_dir(),
    }
}

/// Key provider selected by `key_source`.
pub fn key_provider(config: &Config) -> Result<Box<dyn KeyProvider>> {
    match config.key_source.unwrap_or_default() {
        KeySource::File => {
            let path = resolve_data_dir(config)?.join("keys").join("vault.pem");
            debug!(?path, "using key file");
            Ok(Box::new(FileKeyProvider::new(path)))
        }
        KeySource::Keyring => Ok(Box::new(KeyringProvider::new(
            KEYRING_SERVICE,
            KEYRING_ACCOUNT,
        ))),
    }
}

pub async fn load_keys(config: &Config) -> Result<Arc<KeyManager>> {
    Ok(key_provider(config)?.get_or_create().await?)
}

/// Account database in the data directory.
pub fn credential_store(config: &Config) -> Result<FileCredentialStore> {
    let path = resolve_data_dir(config)?.join("users.json");
    Ok(FileCredentialStore::new(
        path,
        config.password_hash.unwrap_or_default(),
    ))
}

/// Build the vault over the filesystem port and the configured keypair.
pub async fn open_vault(config: &Config) -> Result<VaultStore<FileStoragePort>> {
    let root = resolve_data_dir(config)?.join("vault");
    debug!(?root, "initializing vault store");
    let keys = load_keys(config).await?;
    Ok(VaultStore::new(
        FileStoragePort::new(root),
        BlockCipherEngine::new(keys),
    ))
}

/// Helper for tests: a vault over an in-memory port with a fresh keypair.
#[cfg(test)]
pub fn test_vault() -> VaultStore<strongbox_core::storage::InMemoryStoragePort> {
    use std::sync::OnceLock;

    static KEYS: OnceLock<Arc<KeyManager>> = OnceLock::new();
    let keys = KEYS.get_or_init(|| Arc::new(KeyManager::generate().expect("keys")));
    VaultStore::new(
        strongbox_core::storage::InMemoryStoragePort::new(),
        BlockCipherEngine::new(keys.clone()),
    )
}
