//! Execution-context-aware provider selection.
//!
//! A scheduled job has no end user, so only the application's own
//! client-credentials identity is legal there; an interactive request may
//! use either grant type. The context is an explicit value threaded through
//! call sites - selection never inspects thread names or other ambient
//! state, which keeps it trivially testable.

use std::sync::Arc;

use crate::delegated::provider::DelegatedTokenProvider;
use crate::error::AuthError;
use crate::types::Principal;
use crate::AuthResult;

/// The unit of work currently asking for a delegated token.
#[derive(Debug, Clone)]
pub enum ExecutionContext {
    /// An interactive HTTP request with a live end-user principal.
    Interactive(Principal),

    /// An unattended scheduled job; no end user is present.
    Scheduled,
}

impl ExecutionContext {
    /// The end-user principal, when one is present.
    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Self::Interactive(principal) => Some(principal),
            Self::Scheduled => None,
        }
    }

    /// Returns `true` for scheduled-job contexts.
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        matches!(self, Self::Scheduled)
    }
}

/// Chooses between the interactive and background delegated-token providers.
pub struct ManagerSelector {
    interactive: Arc<DelegatedTokenProvider>,
    background: Arc<DelegatedTokenProvider>,
}

impl ManagerSelector {
    /// Creates a selector over the two provider instances.
    #[must_use]
    pub fn new(
        interactive: Arc<DelegatedTokenProvider>,
        background: Arc<DelegatedTokenProvider>,
    ) -> Self {
        Self {
            interactive,
            background,
        }
    }

    /// Selects the provider legal for the given context.
    #[must_use]
    pub fn select(&self, context: &ExecutionContext) -> &Arc<DelegatedTokenProvider> {
        match context {
            ExecutionContext::Interactive(_) => &self.interactive,
            ExecutionContext::Scheduled => &self.background,
        }
    }

    /// Returns an application-level token (client-credentials) through the
    /// context's provider. Legal from both contexts.
    ///
    /// # Errors
    ///
    /// Propagates provider errors.
    pub async fn app_token(
        &self,
        context: &ExecutionContext,
        registration_id: &str,
    ) -> AuthResult<String> {
        self.select(context).access_token(registration_id).await
    }

    /// Returns a user-delegated token for the context's principal.
    ///
    /// # Errors
    ///
    /// Fails fast with [`AuthError::NoPrincipalInContext`] when called from
    /// a scheduled context - there is no end user whose delegation could be
    /// used, and silently substituting a stale or wrong principal would be
    /// worse than the error.
    pub async fn user_token(
        &self,
        context: &ExecutionContext,
        registration_id: &str,
    ) -> AuthResult<String> {
        match context {
            ExecutionContext::Interactive(principal) => {
                self.interactive
                    .access_token_for(registration_id, principal)
                    .await
            }
            ExecutionContext::Scheduled => {
                tracing::warn!(
                    registration_id = %registration_id,
                    "User-delegated token requested from a scheduled context"
                );
                Err(AuthError::NoPrincipalInContext)
            }
        }
    }
}
