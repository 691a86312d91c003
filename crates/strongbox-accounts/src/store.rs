use std::{
    collections::BTreeMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strongbox_core::auth::{AuthError, Principal};
use tempfile::NamedTempFile;
use tracing::{info, instrument, warn};

use crate::{
    hash::{hash_password, verify_password, HashParams},
    AccountError,
};

const MAX_USERNAME_LEN: usize = 64;

/// Username to password-hash lookup.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Creates an account. Returns `false` when the username is taken.
    async fn register(&self, username: &str, password: &str) -> Result<bool, AccountError>;

    /// Verifies a password and yields the account's principal.
    async fn authenticate(&self, username: &str, password: &str) -> Result<Principal, AuthError>;

    async fn user_exists(&self, username: &str) -> Result<bool, AccountError>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct StoredUser {
    password_hash: String,
}

type UserMap = BTreeMap<String, StoredUser>;

/// Credentials kept as a JSON map in a single file.
///
/// The internal lock serializes updates within one process only. Two
/// processes registering at the same moment can lose one of the accounts.
pub struct FileCredentialStore {
    path: PathBuf,
    params: HashParams,
    lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>, params: HashParams) -> Self {
        Self {
            path: path.into(),
            params,
            lock: Mutex::new(()),
        }
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>, AccountError> {
        self.lock
            .lock()
            .map_err(|err| AccountError::Store(format!("lock poisoned: {err}")))
    }

    fn load(&self) -> Result<UserMap, AccountError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(UserMap::new()),
            Err(err) => return Err(AccountError::Store(err.to_string())),
        };
        if bytes.is_empty() {
            return Ok(UserMap::new());
        }
        serde_json::from_slice(&bytes).map_err(|e| AccountError::Store(e.to_string()))
    }

    fn save(&self, users: &UserMap) -> Result<(), AccountError> {
        let json =
            serde_json::to_vec_pretty(users).map_err(|e| AccountError::Store(e.to_string()))?;
        write_private(&self.path, &json).map_err(|e| AccountError::Store(e.to_string()))
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    #[instrument(skip(self, password))]
    async fn register(&self, username: &str, password: &str) -> Result<bool, AccountError> {
        validate(username, password)?;
        let _guard = self.guard()?;
        let mut users = self.load()?;
        if users.contains_key(username) {
            return Ok(false);
        }
        let password_hash = hash_password(password, &self.params)?;
        users.insert(username.to_string(), StoredUser { password_hash });
        self.save(&users)?;
        info!("registered account");
        Ok(true)
    }

    #[instrument(skip(self, password))]
    async fn authenticate(&self, username: &str, password: &str) -> Result<Principal, AuthError> {
        let stored = {
            let _guard = self.guard().map_err(store_failure)?;
            self.load().map_err(store_failure)?.remove(username)
        };
        check(username, password, stored)
    }

    async fn user_exists(&self, username: &str) -> Result<bool, AccountError> {
        let _guard = self.guard()?;
        Ok(self.load()?.contains_key(username))
    }
}

/// In-memory credential store for tests and ephemeral sessions.
#[derive(Debug, Clone)]
pub struct InMemoryCredentialStore {
    users: Arc<Mutex<UserMap>>,
    params: HashParams,
}

impl InMemoryCredentialStore {
    pub fn new(params: HashParams) -> Self {
        Self {
            users: Arc::default(),
            params,
        }
    }

    fn users(&self) -> Result<MutexGuard<'_, UserMap>, AccountError> {
        self.users
            .lock()
            .map_err(|err| AccountError::Store(format!("lock poisoned: {err}")))
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn register(&self, username: &str, password: &str) -> Result<bool, AccountError> {
        validate(username, password)?;
        let mut users = self.users()?;
        if users.contains_key(username) {
            return Ok(false);
        }
        let password_hash = hash_password(password, &self.params)?;
        users.insert(username.to_string(), StoredUser { password_hash });
        Ok(true)
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<Principal, AuthError> {
        let stored = self.users().map_err(store_failure)?.get(username).cloned();
        check(username, password, stored)
    }

    async fn user_exists(&self, username: &str) -> Result<bool, AccountError> {
        Ok(self.users()?.contains_key(username))
    }
}

fn validate(username: &str, password: &str) -> Result<(), AccountError> {
    if username.is_empty()
        || username.len() > MAX_USERNAME_LEN
        || username.trim() != username
        || username.chars().any(char::is_control)
    {
        return Err(AccountError::InvalidUsername(username.to_string()));
    }
    if password.is_empty() {
        return Err(AccountError::EmptyPassword);
    }
    Ok(())
}

fn check(
    username: &str,
    password: &str,
    stored: Option<StoredUser>,
) -> Result<Principal, AuthError> {
    let Some(user) = stored else {
        return Err(AuthError::InvalidCredentials);
    };
    match verify_password(password, &user.password_hash) {
        Ok(true) => Ok(Principal::new(username)),
        Ok(false) => Err(AuthError::InvalidCredentials),
        Err(err) => {
            warn!(%err, "stored password hash is unreadable");
            Err(AuthError::InvalidCredentials)
        }
    }
}

fn store_failure(err: AccountError) -> AuthError {
    AuthError::Store {
        reason: err.to_string(),
    }
}

fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid credentials path")
    })?;
    fs::create_dir_all(parent)?;
    let mut tmp = NamedTempFile::new_in(parent)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
