use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Suffix appended to every generated storage key.
pub const BLOB_SUFFIX: &str = ".encrypted";

/// Metadata for one encrypted file held in the vault.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SecureFileRecord {
    /// Original file name, for display only.
    pub display_name: String,
    /// Opaque identifier of the encrypted blob.
    pub storage_key: String,
    /// Principal that created the record.
    pub owner_id: String,
    /// Length of the plaintext in bytes.
    pub plaintext_size: u64,
    /// Creation time in epoch milliseconds.
    pub created_at: i64,
}

impl SecureFileRecord {
    /// Builds a record with a freshly generated storage key, stamped now.
    pub fn new(
        display_name: impl Into<String>,
        owner_id: impl Into<String>,
        plaintext_size: u64,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            storage_key: fresh_storage_key(),
            owner_id: owner_id.into(),
            plaintext_size,
            created_at: Utc::now().timestamp_millis(),
        }
    }

    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        self.owner_id == owner_id
    }
}

impl fmt::Display for SecureFileRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} KB)", self.display_name, self.plaintext_size / 1024)
    }
}

/// Random, collision-free key for a new blob.
pub fn fresh_storage_key() -> String {
    format!("{}{BLOB_SUFFIX}", Uuid::new_v4())
}

/// Sorts newest first; equal timestamps fall back to storage key order.
pub fn sort_newest_first(records: &mut [SecureFileRecord]) {
    records.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.storage_key.cmp(&b.storage_key))
    });
}
