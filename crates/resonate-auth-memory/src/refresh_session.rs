//! In-memory refresh session storage.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use resonate_auth::types::RefreshSession;
use resonate_auth::{AuthResult, RefreshSessionStorage};

/// Refresh session storage over a guarded hash map.
#[derive(Default)]
pub struct InMemoryRefreshSessionStorage {
    sessions: RwLock<HashMap<Uuid, RefreshSession>>,
}

impl InMemoryRefreshSessionStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions (diagnostics).
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns `true` when no sessions are stored.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl RefreshSessionStorage for InMemoryRefreshSessionStorage {
    async fn create(&self, session: &RefreshSession) -> AuthResult<()> {
        self.sessions
            .write()
            .await
            .insert(session.id, session.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<RefreshSession>> {
        Ok(self.sessions.read().await.get(&id).cloned())
    }

    async fn rotate(
        &self,
        id: Uuid,
        expected_hash: &str,
        new_hash: &str,
        new_expires_at: OffsetDateTime,
    ) -> AuthResult<bool> {
        // Compare-and-swap under the write lock: the check and the update
        // are one critical section.
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&id) {
            Some(session) if session.token_hash == expected_hash => {
                session.token_hash = new_hash.to_string();
                session.expires_at = new_expires_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_by_principal(&self, principal_public_id: &str) -> AuthResult<u64> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.principal_public_id != principal_public_id);
        Ok((before - sessions.len()) as u64)
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired());
        let removed = (before - sessions.len()) as u64;
        if removed > 0 {
            tracing::debug!(removed, "Expired refresh sessions cleaned up");
        }
        Ok(removed)
    }
}
