//! Refresh session storage trait.
//!
//! # Security Considerations
//!
//! - Token strings are stored as SHA-256 hashes only
//! - Rotation must be atomic at the storage layer: two concurrent refreshes
//!   presenting the same consumed token must not both succeed. An in-process
//!   lock is not sufficient across multiple server instances, so the
//!   compare-and-swap lives here, not in the manager.

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::RefreshSession;

/// Storage trait for refresh sessions.
#[async_trait]
pub trait RefreshSessionStorage: Send + Sync {
    /// Stores a new refresh session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be stored (duplicate id,
    /// storage unavailable).
    async fn create(&self, session: &RefreshSession) -> AuthResult<()>;

    /// Finds a refresh session by id.
    ///
    /// Returns sessions regardless of expiry; callers check validity.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<RefreshSession>>;

    /// Rotates the session's token in place: replaces the stored hash with
    /// `new_hash` only if the stored hash still equals `expected_hash`.
    ///
    /// This is the compare-and-swap that makes refresh-token rotation safe
    /// under concurrency. Returns `false` when the session is absent or the
    /// stored hash no longer matches (already rotated by a concurrent
    /// refresh) - the caller must fail closed.
    ///
    /// # Errors
    ///
    /// Returns an error only if the storage operation itself fails; a lost
    /// race is `Ok(false)`.
    async fn rotate(
        &self,
        id: Uuid,
        expected_hash: &str,
        new_hash: &str,
        new_expires_at: OffsetDateTime,
    ) -> AuthResult<bool>;

    /// Deletes all sessions owned by a principal (logout everywhere,
    /// account deletion).
    ///
    /// Returns the number of sessions deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    async fn delete_by_principal(&self, principal_public_id: &str) -> AuthResult<u64>;

    /// Deletes expired sessions. Should be called periodically to prevent
    /// storage growth.
    ///
    /// Returns the number of sessions deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup operation fails.
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}
