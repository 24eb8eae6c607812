//! Refresh, authentication-check and logout handlers.
//!
//! The refresh endpoint is independent of the access-token path: it consumes
//! the refresh cookie, rotates the session and returns a fresh access token.
//! Expired sessions and logged-out users retrying are expected operational
//! states - every refresh failure answers 401 with the cookie cleared, never
//! a 5xx.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::middleware::AuthState;

/// Body returned by a successful refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// The session owner's username.
    pub username: String,

    /// The session owner's roles.
    pub roles: Vec<String>,

    /// Newly issued access token.
    pub new_access_token: String,
}

/// Body returned by the authentication-check endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthCheckResponse {
    /// Whether the refresh cookie currently validates.
    pub authenticated: bool,
}

/// Exchanges the refresh cookie for a new access token and a rotated
/// refresh cookie. Accepts `GET` and `POST`.
pub async fn refresh_handler(State(state): State<AuthState>, jar: CookieJar) -> Response {
    let manager = &state.refresh_manager;

    let token = jar
        .get(manager.cookie_name())
        .map(|cookie| cookie.value().to_string());
    let Some(token) = token else {
        tracing::debug!("Refresh request without refresh cookie");
        return (StatusCode::UNAUTHORIZED, jar.add(manager.clear_cookie())).into_response();
    };

    match manager.refresh(&token).await {
        Ok(refreshed) => {
            let body = LoginResponse {
                username: refreshed.principal.username.clone(),
                roles: refreshed.principal.roles.clone(),
                new_access_token: refreshed.access_token,
            };
            (jar.add(refreshed.cookie), Json(body)).into_response()
        }
        Err(e) if e.is_unauthenticated() => {
            tracing::debug!(error = %e, "Refresh rejected");
            (StatusCode::UNAUTHORIZED, jar.add(manager.clear_cookie())).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Refresh failed");
            e.into_response()
        }
    }
}

/// Reports whether the refresh cookie currently validates.
pub async fn auth_check_handler(
    State(state): State<AuthState>,
    jar: CookieJar,
) -> Json<AuthCheckResponse> {
    let manager = &state.refresh_manager;

    let authenticated = match jar.get(manager.cookie_name()) {
        Some(cookie) => manager.validate(cookie.value()).await,
        None => false,
    };

    Json(AuthCheckResponse { authenticated })
}

/// Revokes all of the caller's refresh sessions and clears the cookie.
///
/// Identified by the refresh cookie itself, so logout works even after the
/// access token has expired. Always answers 204 with a cleared cookie - an
/// already-invalid cookie has nothing left to revoke.
pub async fn logout_handler(State(state): State<AuthState>, jar: CookieJar) -> Response {
    let manager = &state.refresh_manager;

    let token = jar
        .get(manager.cookie_name())
        .map(|cookie| cookie.value().to_string());
    if let Some(token) = token {
        if let Some(principal) = manager.resolve_owner(&token).await {
            if let Err(e) = manager.revoke(&principal).await {
                tracing::error!(error = %e, "Failed to revoke refresh sessions");
                return e.into_response();
            }
        }
    }

    (StatusCode::NO_CONTENT, jar.add(manager.clear_cookie())).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        AccessTokenConfig, AuthConfig, RefreshTokenConfig, StateCookieConfig,
    };
    use crate::context::ManagerSelector;
    use crate::delegated::endpoint::{TokenEndpoint, TokenEndpointResponse};
    use crate::delegated::provider::DelegatedTokenProvider;
    use crate::state::AuthorizationStateStore;
    use crate::storage::{
        DelegatedAuthorizationStorage, PrincipalStore, RefreshSessionStorage,
    };
    use crate::token::access::AccessTokenIssuer;
    use crate::token::codec::{SigningKey, TokenCodec};
    use crate::token::refresh::RefreshTokenManager;
    use crate::types::{DelegatedAuthorization, Principal, RefreshSession};
    use crate::{AuthError, AuthResult};
    use async_trait::async_trait;
    use axum::body::to_bytes;
    use cookie::Cookie;
    use std::collections::HashMap;
    use std::sync::{Arc, RwLock};
    use time::OffsetDateTime;
    use uuid::Uuid;

    struct MemorySessions {
        sessions: RwLock<HashMap<Uuid, RefreshSession>>,
    }

    #[async_trait]
    impl RefreshSessionStorage for MemorySessions {
        async fn create(&self, session: &RefreshSession) -> AuthResult<()> {
            self.sessions
                .write()
                .unwrap()
                .insert(session.id, session.clone());
            Ok(())
        }

        async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<RefreshSession>> {
            Ok(self.sessions.read().unwrap().get(&id).cloned())
        }

        async fn rotate(
            &self,
            id: Uuid,
            expected_hash: &str,
            new_hash: &str,
            new_expires_at: OffsetDateTime,
        ) -> AuthResult<bool> {
            let mut sessions = self.sessions.write().unwrap();
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
            let mut sessions = self.sessions.write().unwrap();
            let before = sessions.len();
            sessions.retain(|_, s| s.principal_public_id != principal_public_id);
            Ok((before - sessions.len()) as u64)
        }

        async fn cleanup_expired(&self) -> AuthResult<u64> {
            Ok(0)
        }
    }

    struct MemoryPrincipals {
        principals: HashMap<String, Principal>,
    }

    #[async_trait]
    impl PrincipalStore for MemoryPrincipals {
        async fn find_by_public_id(&self, public_id: &str) -> AuthResult<Option<Principal>> {
            Ok(self.principals.get(public_id).cloned())
        }

        async fn find_by_username(&self, username: &str) -> AuthResult<Option<Principal>> {
            Ok(self
                .principals
                .values()
                .find(|p| p.username == username)
                .cloned())
        }
    }

    struct NoAuthorizations;

    #[async_trait]
    impl DelegatedAuthorizationStorage for NoAuthorizations {
        async fn find(
            &self,
            _registration_id: &str,
            _principal_key: &str,
        ) -> AuthResult<Option<DelegatedAuthorization>> {
            Ok(None)
        }

        async fn upsert(&self, _authorization: &DelegatedAuthorization) -> AuthResult<()> {
            Ok(())
        }

        async fn delete(&self, _registration_id: &str, _principal_key: &str) -> AuthResult<bool> {
            Ok(false)
        }

        async fn delete_by_principal(&self, _principal_key: &str) -> AuthResult<u64> {
            Ok(0)
        }
    }

    struct NoEndpoint;

    #[async_trait]
    impl TokenEndpoint for NoEndpoint {
        async fn client_credentials(
            &self,
            registration: &crate::config::RegistrationConfig,
        ) -> AuthResult<TokenEndpointResponse> {
            Err(AuthError::token_endpoint(&registration.id, "unreachable"))
        }

        async fn exchange_code(
            &self,
            registration: &crate::config::RegistrationConfig,
            _code: &str,
        ) -> AuthResult<TokenEndpointResponse> {
            Err(AuthError::token_endpoint(&registration.id, "unreachable"))
        }

        async fn refresh_token(
            &self,
            registration: &crate::config::RegistrationConfig,
            _refresh_token: &str,
        ) -> AuthResult<TokenEndpointResponse> {
            Err(AuthError::token_endpoint(&registration.id, "unreachable"))
        }
    }

    fn test_state(principal: &Principal) -> AuthState {
        let key = SigningKey::from_secret("0123456789abcdef0123456789abcdef").unwrap();
        let codec = Arc::new(TokenCodec::new(&key, "https://resonate.example.com"));

        let mut principals = HashMap::new();
        principals.insert(principal.public_id.clone(), principal.clone());
        let principals = Arc::new(MemoryPrincipals { principals });

        let access_issuer = Arc::new(AccessTokenIssuer::new(
            codec.clone(),
            principals.clone(),
            AccessTokenConfig::default(),
        ));

        let refresh_manager = Arc::new(RefreshTokenManager::new(
            codec,
            access_issuer.clone(),
            Arc::new(MemorySessions {
                sessions: RwLock::new(HashMap::new()),
            }),
            principals,
            RefreshTokenConfig {
                cookie_domain: "resonate.example.com".to_string(),
                ..RefreshTokenConfig::default()
            },
        ));

        let provider = || {
            Arc::new(DelegatedTokenProvider::new(
                Vec::new(),
                Arc::new(NoAuthorizations),
                Arc::new(NoEndpoint),
                std::time::Duration::from_secs(15),
            ))
        };

        AuthState {
            access_issuer,
            refresh_manager,
            selector: Arc::new(ManagerSelector::new(provider(), provider())),
            state_store: Arc::new(AuthorizationStateStore::new(StateCookieConfig::default())),
            config: Arc::new(AuthConfig::default()),
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_refresh_happy_path() {
        let principal = Principal::new("u1", "alice").with_role("USER");
        let state = test_state(&principal);

        let issued = state
            .refresh_manager
            .create_session(&principal)
            .await
            .unwrap();

        let jar = CookieJar::new().add(Cookie::new("refresh_token", issued.token.clone()));
        let response = refresh_handler(State(state.clone()), jar).await;
        assert_eq!(response.status(), StatusCode::OK);

        // A rotated refresh cookie is set alongside the body.
        let set_cookie = response
            .headers()
            .get_all(axum::http::header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect::<Vec<_>>();
        assert!(set_cookie.iter().any(|c| c.starts_with("refresh_token=")
            && !c.contains(&issued.token)));

        let body = body_json(response).await;
        assert_eq!(body["username"], "alice");
        assert_eq!(body["roles"][0], "USER");
        assert!(body["newAccessToken"].as_str().is_some_and(|t| !t.is_empty()));

        // The consumed token no longer refreshes.
        let jar = CookieJar::new().add(Cookie::new("refresh_token", issued.token));
        let replay = refresh_handler(State(state), jar).await;
        assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_without_cookie() {
        let state = test_state(&Principal::new("u1", "alice"));
        let response = refresh_handler(State(state), CookieJar::new()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_with_garbage_cookie_clears_it() {
        let state = test_state(&Principal::new("u1", "alice"));
        let jar = CookieJar::new().add(Cookie::new("refresh_token", "garbage"));

        let response = refresh_handler(State(state), jar).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let set_cookie = response
            .headers()
            .get(axum::http::header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(set_cookie.starts_with("refresh_token="));
        assert!(set_cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_auth_check() {
        let principal = Principal::new("u1", "alice");
        let state = test_state(&principal);

        let Json(body) = auth_check_handler(State(state.clone()), CookieJar::new()).await;
        assert!(!body.authenticated);

        let issued = state
            .refresh_manager
            .create_session(&principal)
            .await
            .unwrap();
        let jar = CookieJar::new().add(Cookie::new("refresh_token", issued.token));
        let Json(body) = auth_check_handler(State(state), jar).await;
        assert!(body.authenticated);
    }

    #[tokio::test]
    async fn test_logout_revokes_and_clears() {
        let principal = Principal::new("u1", "alice");
        let state = test_state(&principal);

        let issued = state
            .refresh_manager
            .create_session(&principal)
            .await
            .unwrap();
        let jar = CookieJar::new().add(Cookie::new("refresh_token", issued.token.clone()));

        let response = logout_handler(State(state.clone()), jar).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        // The session is gone.
        assert!(!state.refresh_manager.validate(&issued.token).await);
    }
}
