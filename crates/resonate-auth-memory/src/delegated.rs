//! In-memory delegated authorization storage.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use resonate_auth::types::DelegatedAuthorization;
use resonate_auth::{AuthResult, DelegatedAuthorizationStorage};

type Key = (String, String);

/// Delegated authorization storage keyed by `(registration, principal)`.
#[derive(Default)]
pub struct InMemoryDelegatedAuthorizationStorage {
    rows: RwLock<HashMap<Key, DelegatedAuthorization>>,
}

impl InMemoryDelegatedAuthorizationStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored authorizations (diagnostics).
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Returns `true` when no authorizations are stored.
    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl DelegatedAuthorizationStorage for InMemoryDelegatedAuthorizationStorage {
    async fn find(
        &self,
        registration_id: &str,
        principal_key: &str,
    ) -> AuthResult<Option<DelegatedAuthorization>> {
        Ok(self
            .rows
            .read()
            .await
            .get(&(registration_id.to_string(), principal_key.to_string()))
            .cloned())
    }

    async fn upsert(&self, authorization: &DelegatedAuthorization) -> AuthResult<()> {
        self.rows.write().await.insert(
            (
                authorization.registration_id.clone(),
                authorization.principal_key.clone(),
            ),
            authorization.clone(),
        );
        Ok(())
    }

    async fn delete(&self, registration_id: &str, principal_key: &str) -> AuthResult<bool> {
        Ok(self
            .rows
            .write()
            .await
            .remove(&(registration_id.to_string(), principal_key.to_string()))
            .is_some())
    }

    async fn delete_by_principal(&self, principal_key: &str) -> AuthResult<u64> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|(_, key), _| key != principal_key);
        Ok((before - rows.len()) as u64)
    }
}
