use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Authenticated identity the vault scopes records to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    /// Stable owner identifier (the username for local accounts).
    pub owner_id: String,
}

impl Principal {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("credential store failure: {reason}")]
    Store { reason: String },
}

/// Supplies the principal for the current caller. The vault trusts it as-is.
pub trait AuthProvider: Send + Sync {
    fn current(&self) -> Result<Principal, AuthError>;
}

/// Fixed identity, handy for tests and offline smoke checks.
pub struct StaticAuth(pub Principal);

impl AuthProvider for StaticAuth {
    fn current(&self) -> Result<Principal, AuthError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_auth_yields_its_principal() {
        let auth = StaticAuth(Principal::new("alice"));
        assert_eq!(auth.current().expect("principal").owner_id, "alice");
    }
}
