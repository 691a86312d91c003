use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use color_eyre::Result;
use strongbox_accounts::Session;
use strongbox_core::{
    auth::AuthProvider,
    record::SecureFileRecord,
    storage::StoragePort,
};
use strongbox_vault::VaultStore;
use tempfile::NamedTempFile;
use tracing::info;

use crate::{cli::Login, config, storage};

/// Authenticate against the local account database.
pub async fn login(login: &Login, config: &config::Config) -> Result<Session> {
    let store = storage::credential_store(config)?;
    Ok(Session::login(&store, &login.user, &login.password).await?)
}

/// Encrypt a file from disk into the vault for the current principal.
pub async fn put<S: StoragePort>(
    vault: &VaultStore<S>,
    auth: &dyn AuthProvider,
    path: &Path,
    name: Option<String>,
) -> Result<SecureFileRecord> {
    let owner = auth.current()?.owner_id;
    let bytes = fs::read(path)?;
    let display_name = name.unwrap_or_else(|| {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    });
    Ok(vault.store(&bytes, &owner, &display_name).await?)
}

pub async fn list<S: StoragePort>(
    vault: &VaultStore<S>,
    auth: &dyn AuthProvider,
) -> Result<Vec<SecureFileRecord>> {
    let owner = auth.current()?.owner_id;
    Ok(vault.list_for(&owner).await?)
}

/// Decrypt into `output`. The destination only appears once decryption has
/// fully succeeded.
pub async fn get<S: StoragePort>(
    vault: &VaultStore<S>,
    auth: &dyn AuthProvider,
    storage_key: &str,
    output: &Path,
) -> Result<SecureFileRecord> {
    let owner = auth.current()?.owner_id;
    let record = vault.find(&owner, storage_key).await?;

    let parent = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let mut tmp = NamedTempFile::new_in(parent)?;
    vault.retrieve(&record, &owner, tmp.as_file_mut()).await?;
    tmp.flush()?;
    tmp.persist(output).map_err(|e| e.error)?;
    info!(key = %record.storage_key, "restored file");
    Ok(record)
}

pub async fn remove<S: StoragePort>(
    vault: &VaultStore<S>,
    auth: &dyn AuthProvider,
    storage_key: &str,
) -> Result<SecureFileRecord> {
    let owner = auth.current()?.owner_id;
    let record = vault.find(&owner, storage_key).await?;
    vault.delete(&record, &owner).await?;
    Ok(record)
}

/// One listing line: key, timestamp, and the record's display form.
pub fn describe(record: &SecureFileRecord) -> String {
    let when = DateTime::<Utc>::from_timestamp_millis(record.created_at)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown".to_string());
    format!("{}  {}  {}", record.storage_key, when, record)
}
