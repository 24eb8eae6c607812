//! Cached delegated-token acquisition for both grant types.
//!
//! One provider instance serves a set of client registrations against one
//! storage backend. Client-credentials tokens are shared under the system
//! principal; authorization-code tokens are per user. Callers racing on the
//! same stale cache entry are serialized by a per-entry async lock, so at
//! most one exchange is in flight per `(registration, principal)` within a
//! process; a losing racer finds the freshly stored token and returns it
//! without a second exchange.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::config::RegistrationConfig;
use crate::delegated::endpoint::TokenEndpoint;
use crate::error::AuthError;
use crate::storage::DelegatedAuthorizationStorage;
use crate::types::{DelegatedAuthorization, GrantType, Principal, SYSTEM_PRINCIPAL};
use crate::AuthResult;

/// Acquires and caches delegated third-party access tokens.
pub struct DelegatedTokenProvider {
    registrations: HashMap<String, RegistrationConfig>,
    storage: Arc<dyn DelegatedAuthorizationStorage>,
    endpoint: Arc<dyn TokenEndpoint>,
    grace_period: Duration,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DelegatedTokenProvider {
    /// Creates a provider over the given registrations.
    #[must_use]
    pub fn new(
        registrations: Vec<RegistrationConfig>,
        storage: Arc<dyn DelegatedAuthorizationStorage>,
        endpoint: Arc<dyn TokenEndpoint>,
        grace_period: Duration,
    ) -> Self {
        Self {
            registrations: registrations
                .into_iter()
                .map(|r| (r.id.clone(), r))
                .collect(),
            storage,
            endpoint,
            grace_period,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn registration(&self, registration_id: &str) -> AuthResult<&RegistrationConfig> {
        self.registrations
            .get(registration_id)
            .ok_or_else(|| AuthError::unknown_registration(registration_id))
    }

    /// Single-flight lock for one cache entry.
    async fn entry_lock(&self, registration_id: &str, principal_key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(format!("{registration_id}/{principal_key}"))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Returns an application-level access token (client-credentials grant).
    ///
    /// Serves the cached token while it is outside the grace window;
    /// otherwise performs one exchange, stores the result and returns it.
    ///
    /// # Errors
    ///
    /// - [`AuthError::UnknownRegistration`] - the id is not configured
    /// - [`AuthError::TokenEndpointError`] - the exchange failed; any cached
    ///   (possibly stale) entry is left untouched
    pub async fn access_token(&self, registration_id: &str) -> AuthResult<String> {
        let registration = self.registration(registration_id)?;

        let lock = self.entry_lock(registration_id, SYSTEM_PRINCIPAL).await;
        let _guard = lock.lock().await;

        if let Some(cached) = self.storage.find(registration_id, SYSTEM_PRINCIPAL).await? {
            if !cached.needs_refresh(self.grace_period) {
                return Ok(cached.access_token);
            }
            tracing::debug!(
                registration_id = %registration_id,
                "Cached application token inside grace window"
            );
        }

        let response = self.endpoint.client_credentials(registration).await?;
        let authorization = DelegatedAuthorization {
            registration_id: registration_id.to_string(),
            grant_type: GrantType::ClientCredentials,
            principal_key: SYSTEM_PRINCIPAL.to_string(),
            access_token: response.access_token.clone(),
            refresh_token: response.refresh_token.clone(),
            expires_at: response.expires_at(),
        };
        self.storage.upsert(&authorization).await?;

        tracing::info!(
            registration_id = %registration_id,
            "Application token acquired"
        );
        Ok(authorization.access_token)
    }

    /// Returns a user-delegated access token (authorization-code grant).
    ///
    /// There is no authorization code available at token-request time, so a
    /// missing or unrefreshable authorization is surfaced as an error and
    /// the caller must send the user through the redirect flow again.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NoAuthorizationFound`] - the user never authorized
    /// - [`AuthError::ReauthorizationRequired`] - consent expired or revoked
    /// - [`AuthError::TokenEndpointError`] - transient upstream failure; the
    ///   cached entry is left untouched
    pub async fn access_token_for(
        &self,
        registration_id: &str,
        principal: &Principal,
    ) -> AuthResult<String> {
        let registration = self.registration(registration_id)?;

        let lock = self.entry_lock(registration_id, &principal.public_id).await;
        let _guard = lock.lock().await;

        let cached = self
            .storage
            .find(registration_id, &principal.public_id)
            .await?
            .ok_or_else(|| AuthError::no_authorization(registration_id))?;

        if !cached.needs_refresh(self.grace_period) {
            return Ok(cached.access_token);
        }

        let Some(refresh_token) = cached.refresh_token.clone() else {
            tracing::warn!(
                registration_id = %registration_id,
                principal = %principal.public_id,
                "Delegated token stale and no refresh token held"
            );
            return Err(AuthError::reauthorization_required(registration_id));
        };

        let response = self
            .endpoint
            .refresh_token(registration, &refresh_token)
            .await?;

        let authorization = DelegatedAuthorization {
            registration_id: registration_id.to_string(),
            grant_type: GrantType::AuthorizationCode,
            principal_key: principal.public_id.clone(),
            access_token: response.access_token.clone(),
            // Providers may omit the refresh token on rotation; keep the one
            // we have in that case.
            refresh_token: response.refresh_token.clone().or(Some(refresh_token)),
            expires_at: response.expires_at(),
        };
        self.storage.upsert(&authorization).await?;

        tracing::info!(
            registration_id = %registration_id,
            principal = %principal.public_id,
            "Delegated token refreshed"
        );
        Ok(authorization.access_token)
    }

    /// Completes the authorization-code handshake: exchanges the code and
    /// persists the per-user authorization.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenEndpointError`] if the exchange fails.
    pub async fn complete_authorization(
        &self,
        registration_id: &str,
        principal: &Principal,
        code: &str,
    ) -> AuthResult<()> {
        let registration = self.registration(registration_id)?;

        let response = self.endpoint.exchange_code(registration, code).await?;
        let authorization = DelegatedAuthorization {
            registration_id: registration_id.to_string(),
            grant_type: GrantType::AuthorizationCode,
            principal_key: principal.public_id.clone(),
            access_token: response.access_token.clone(),
            refresh_token: response.refresh_token.clone(),
            expires_at: response.expires_at(),
        };
        self.storage.upsert(&authorization).await?;

        tracing::info!(
            registration_id = %registration_id,
            principal = %principal.public_id,
            "Delegated authorization stored"
        );
        Ok(())
    }

    /// Deletes a principal's authorization when the integration is revoked.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn revoke_authorization(
        &self,
        registration_id: &str,
        principal: &Principal,
    ) -> AuthResult<bool> {
        let removed = self
            .storage
            .delete(registration_id, &principal.public_id)
            .await?;
        if removed {
            tracing::info!(
                registration_id = %registration_id,
                principal = %principal.public_id,
                "Delegated authorization revoked"
            );
        }
        Ok(removed)
    }
}
