//! Principal lookup trait.
//!
//! The user store is an external collaborator: this crate reads principals
//! and never writes them. Writes belong to the user-management subsystem.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::Principal;

/// Read-only lookups against the external user store.
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Finds a principal by its stable public id (token subject).
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup itself fails; an unknown id is
    /// `Ok(None)`.
    async fn find_by_public_id(&self, public_id: &str) -> AuthResult<Option<Principal>>;

    /// Finds a principal by username.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup itself fails; an unknown username is
    /// `Ok(None)`.
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<Principal>>;

    /// Gets a principal by username, erroring when absent.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuthError::Storage`] if the principal does not exist
    /// or the lookup fails.
    async fn get_by_username(&self, username: &str) -> AuthResult<Principal> {
        self.find_by_username(username).await?.ok_or_else(|| {
            crate::AuthError::storage(format!("principal '{username}' not found"))
        })
    }
}
