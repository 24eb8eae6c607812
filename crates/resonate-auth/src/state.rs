//! Single-use, cookie-encoded authorization request state.
//!
//! An in-flight authorization-code request is carried entirely client-side:
//! the serialized state travels in a short-lived cookie, so no server-side
//! session or affinity is needed for the redirect round-trip. The state is
//! consumed exactly once - the callback calls [`AuthorizationStateStore::remove`],
//! never `load`, and a second attempt observes "absent" rather than stale
//! data.
//!
//! The store guarantees single local legibility only; matching the embedded
//! `state` value against the provider's returned `state` parameter is the
//! caller's responsibility.

use axum_extra::extract::cookie::CookieJar;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::config::{RegistrationConfig, StateCookieConfig};
use crate::error::AuthError;
use crate::AuthResult;

/// An in-flight OAuth2 authorization-code request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationRequestState {
    /// The client registration being authorized.
    pub registration_id: String,

    /// OAuth client id sent to the provider.
    pub client_id: String,

    /// Redirect URI sent to the provider.
    pub redirect_uri: String,

    /// The provider's authorization endpoint.
    pub authorization_uri: String,

    /// Requested scopes.
    pub scopes: Vec<String>,

    /// Random anti-forgery value echoed back by the provider.
    pub state: String,

    /// Additional request attributes to restore on the callback.
    #[serde(default, skip_serializing_if = "std::collections::HashMap::is_empty")]
    pub attributes: std::collections::HashMap<String, String>,

    /// When the request was initiated.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl AuthorizationRequestState {
    /// Creates the state for a registration with the given `state` value.
    #[must_use]
    pub fn new(registration: &RegistrationConfig, state: String) -> Self {
        Self {
            registration_id: registration.id.clone(),
            client_id: registration.client_id.clone(),
            redirect_uri: registration.redirect_uri.to_string(),
            authorization_uri: registration.authorization_uri.to_string(),
            scopes: registration.scopes.clone(),
            state,
            attributes: std::collections::HashMap::new(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Attaches a request attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Persists in-flight authorization requests as encoded, single-use cookies.
pub struct AuthorizationStateStore {
    config: StateCookieConfig,
}

impl AuthorizationStateStore {
    /// Creates a store with the given cookie settings.
    #[must_use]
    pub fn new(config: StateCookieConfig) -> Self {
        Self { config }
    }

    /// Name of the state cookie.
    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.config.name
    }

    /// Encodes the state into the jar as a short-lived cookie.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] if serialization fails.
    pub fn save(
        &self,
        jar: CookieJar,
        request: &AuthorizationRequestState,
    ) -> AuthResult<CookieJar> {
        let bytes = serde_json::to_vec(request)
            .map_err(|e| AuthError::internal(format!("Failed to encode state: {e}")))?;
        let value = URL_SAFE_NO_PAD.encode(bytes);

        let cookie = Cookie::build((self.config.name.clone(), value))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(time::Duration::seconds(self.config.max_age.as_secs() as i64))
            .build();

        Ok(jar.add(cookie))
    }

    /// Decodes the state from the jar, if present and within its window.
    ///
    /// Missing, corrupt or expired state is simply absent: the callback
    /// fails with "invalid request", it is not a system fault.
    #[must_use]
    pub fn load(&self, jar: &CookieJar) -> Option<AuthorizationRequestState> {
        let cookie = jar.get(&self.config.name)?;
        self.decode(cookie.value())
    }

    /// Loads the state and expires the cookie (max-age 0).
    ///
    /// Callers finalizing an authorization attempt invoke this exactly once;
    /// afterwards the state is no longer legible from the returned jar.
    #[must_use]
    pub fn remove(&self, jar: CookieJar) -> (CookieJar, Option<AuthorizationRequestState>) {
        let state = self.load(&jar);
        let removal = Cookie::build((self.config.name.clone(), ""))
            .path("/")
            .build();
        (jar.remove(removal), state)
    }

    fn decode(&self, value: &str) -> Option<AuthorizationRequestState> {
        let bytes = URL_SAFE_NO_PAD.decode(value).ok().or_else(|| {
            tracing::debug!("Authorization state cookie is not valid base64");
            None
        })?;
        let state: AuthorizationRequestState = serde_json::from_slice(&bytes).ok().or_else(|| {
            tracing::debug!("Authorization state cookie failed to deserialize");
            None
        })?;

        // Enforce the window on read as well: a replayed value past it is
        // absent even if the client ignored the cookie max-age.
        let max_age = time::Duration::seconds(self.config.max_age.as_secs() as i64);
        if OffsetDateTime::now_utc() > state.created_at + max_age {
            tracing::debug!(
                registration_id = %state.registration_id,
                "Authorization state expired"
            );
            return None;
        }

        Some(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use url::Url;

    fn test_registration() -> RegistrationConfig {
        RegistrationConfig {
            id: "spotify".to_string(),
            client_id: "client-123".to_string(),
            client_secret: "secret-456".to_string(),
            token_uri: Url::parse("https://accounts.spotify.com/api/token").unwrap(),
            authorization_uri: Url::parse("https://accounts.spotify.com/authorize").unwrap(),
            redirect_uri: Url::parse("https://resonate.example.com/oauth2/callback/spotify")
                .unwrap(),
            scopes: vec!["user-follow-read".to_string()],
        }
    }

    fn test_store() -> AuthorizationStateStore {
        AuthorizationStateStore::new(StateCookieConfig::default())
    }

    fn test_state() -> AuthorizationRequestState {
        AuthorizationRequestState::new(&test_registration(), "state-123".to_string())
    }

    #[test]
    fn test_save_load_round_trip() {
        let store = test_store();
        let state = test_state();

        let jar = store.save(CookieJar::new(), &state).unwrap();
        let loaded = store.load(&jar).unwrap();
        assert_eq!(loaded.registration_id, state.registration_id);
        assert_eq!(loaded.client_id, state.client_id);
        assert_eq!(loaded.redirect_uri, state.redirect_uri);
        assert_eq!(loaded.scopes, state.scopes);
        assert_eq!(loaded.state, state.state);
    }

    #[test]
    fn test_attributes_survive_round_trip() {
        let store = test_store();
        let state = test_state().with_attribute("return_to", "/artists/42");

        let jar = store.save(CookieJar::new(), &state).unwrap();
        let loaded = store.load(&jar).unwrap();
        assert_eq!(
            loaded.attributes.get("return_to").map(String::as_str),
            Some("/artists/42")
        );
    }

    #[test]
    fn test_cookie_attributes() {
        let store = test_store();
        let jar = store.save(CookieJar::new(), &test_state()).unwrap();

        let cookie = jar.get("session_state").unwrap();
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(60)));
    }

    #[test]
    fn test_remove_is_single_use() {
        let store = test_store();
        let jar = store.save(CookieJar::new(), &test_state()).unwrap();

        let (jar, first) = store.remove(jar);
        assert!(first.is_some());

        // A second load or remove on the same request context is absent.
        assert!(store.load(&jar).is_none());
        let (_, second) = store.remove(jar);
        assert!(second.is_none());
    }

    #[test]
    fn test_missing_cookie_is_absent() {
        let store = test_store();
        assert!(store.load(&CookieJar::new()).is_none());

        let (_, state) = store.remove(CookieJar::new());
        assert!(state.is_none());
    }

    #[test]
    fn test_corrupt_cookie_is_absent() {
        let store = test_store();

        let jar = CookieJar::new().add(Cookie::new("session_state", "!!not-base64!!"));
        assert!(store.load(&jar).is_none());

        let garbage = URL_SAFE_NO_PAD.encode(b"{\"not\": \"the right shape\"}");
        let jar = CookieJar::new().add(Cookie::new("session_state", garbage));
        assert!(store.load(&jar).is_none());
    }

    #[test]
    fn test_expired_state_is_absent() {
        let store = AuthorizationStateStore::new(StateCookieConfig {
            max_age: Duration::from_secs(60),
            ..StateCookieConfig::default()
        });

        let mut state = test_state();
        state.created_at = OffsetDateTime::now_utc() - time::Duration::seconds(120);

        let jar = store.save(CookieJar::new(), &state).unwrap();
        assert!(store.load(&jar).is_none());
    }
}
