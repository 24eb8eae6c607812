//! In-memory principal store.
//!
//! The production principal store is the application's user database; this
//! implementation backs tests and local development.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use resonate_auth::types::Principal;
use resonate_auth::{AuthResult, PrincipalStore};

/// Principal store over a guarded hash map, keyed by public id.
#[derive(Default)]
pub struct InMemoryPrincipalStore {
    principals: RwLock<HashMap<String, Principal>>,
}

impl InMemoryPrincipalStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a principal.
    pub async fn insert(&self, principal: Principal) {
        self.principals
            .write()
            .await
            .insert(principal.public_id.clone(), principal);
    }

    /// Removes a principal by public id.
    pub async fn remove(&self, public_id: &str) -> bool {
        self.principals.write().await.remove(public_id).is_some()
    }
}

#[async_trait]
impl PrincipalStore for InMemoryPrincipalStore {
    async fn find_by_public_id(&self, public_id: &str) -> AuthResult<Option<Principal>> {
        Ok(self.principals.read().await.get(public_id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AuthResult<Option<Principal>> {
        Ok(self
            .principals
            .read()
            .await
            .values()
            .find(|p| p.username == username)
            .cloned())
    }
}
