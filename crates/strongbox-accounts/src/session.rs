use strongbox_core::auth::{AuthError, AuthProvider, Principal};
use tracing::info;

use crate::store::CredentialStore;

/// Result of a successful login; hands the principal to the vault.
#[derive(Debug, Clone)]
pub struct Session {
    principal: Principal,
}

impl Session {
    pub async fn login<C: CredentialStore + ?Sized>(
        store: &C,
        username: &str,
        password: &str,
    ) -> Result<Self, AuthError> {
        let principal = store.authenticate(username, password).await?;
        info!(owner = %principal.owner_id, "logged in");
        Ok(Self { principal })
    }

    pub fn owner_id(&self) -> &str {
        &self.principal.owner_id
    }
}

impl AuthProvider for Session {
    fn current(&self) -> Result<Principal, AuthError> {
        Ok(self.principal.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HashParams, InMemoryCredentialStore};

    #[tokio::test]
    async fn login_yields_provider_for_owner() {
        let store = InMemoryCredentialStore::new(HashParams::insecure_fast());
        store.register("alice", "pw").await.expect("register");

        let session = Session::login(&store, "alice", "pw").await.expect("login");
        assert_eq!(session.owner_id(), "alice");
        assert_eq!(session.current().expect("principal"), Principal::new("alice"));

        let err = Session::login(&store, "alice", "nope").await.expect_err("bad pw");
        assert_eq!(err, AuthError::InvalidCredentials);
    }
}
