//! Delegated authorization storage trait.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::DelegatedAuthorization;

/// Storage trait for cached third-party authorizations.
///
/// Rows are keyed by `(registration_id, principal_key)`: one row per
/// registration for the system principal, one row per user for
/// authorization-code grants.
#[async_trait]
pub trait DelegatedAuthorizationStorage: Send + Sync {
    /// Finds the cached authorization for a registration and principal.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find(
        &self,
        registration_id: &str,
        principal_key: &str,
    ) -> AuthResult<Option<DelegatedAuthorization>>;

    /// Inserts or replaces the authorization for its key.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn upsert(&self, authorization: &DelegatedAuthorization) -> AuthResult<()>;

    /// Deletes one authorization. Returns `true` if a row existed.
    ///
    /// Used when the owning principal revokes the integration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete(&self, registration_id: &str, principal_key: &str) -> AuthResult<bool>;

    /// Deletes all authorizations owned by a principal (account deletion).
    ///
    /// Returns the number of rows deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    async fn delete_by_principal(&self, principal_key: &str) -> AuthResult<u64>;
}
