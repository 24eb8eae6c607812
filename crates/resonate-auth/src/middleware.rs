//! Axum extractors for request authentication.
//!
//! The extractors resolve the request's bearer token (header first, cookie
//! fallback) into a principal. [`CurrentPrincipal`] never rejects - an
//! unauthenticated request simply carries `None`, so downstream
//! authorization can reject it uniformly. [`RequirePrincipal`] rejects with
//! 401 for handlers that cannot proceed anonymously.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header::AUTHORIZATION, header::COOKIE, request::Parts},
};

use crate::config::AuthConfig;
use crate::context::ManagerSelector;
use crate::state::AuthorizationStateStore;
use crate::token::access::AccessTokenIssuer;
use crate::token::refresh::RefreshTokenManager;
use crate::types::Principal;

/// Shared state for the auth extractors and handlers.
///
/// Include this in your application state and expose it via `FromRef`.
#[derive(Clone)]
pub struct AuthState {
    /// Access token issuance and resolution.
    pub access_issuer: Arc<AccessTokenIssuer>,

    /// Refresh session lifecycle.
    pub refresh_manager: Arc<RefreshTokenManager>,

    /// Context-aware delegated-token provider selection.
    pub selector: Arc<ManagerSelector>,

    /// Single-use authorization-state cookie store.
    pub state_store: Arc<AuthorizationStateStore>,

    /// Auth configuration (registrations, cookie settings).
    pub config: Arc<AuthConfig>,
}

/// Extractor carrying the request's principal, if any.
///
/// Authentication failures are never fatal here; they leave the request
/// anonymous.
pub struct CurrentPrincipal(pub Option<Principal>);

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());
        let cookie = cookie_value(parts, auth_state.access_issuer.cookie_name());

        let principal = auth_state
            .access_issuer
            .resolve_from_request(header, cookie.as_deref())
            .await;

        Ok(CurrentPrincipal(principal))
    }
}

/// Extractor that rejects anonymous requests with 401.
pub struct RequirePrincipal(pub Principal);

impl<S> FromRequestParts<S> for RequirePrincipal
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match CurrentPrincipal::from_request_parts(parts, state).await {
            Ok(CurrentPrincipal(Some(principal))) => Ok(RequirePrincipal(principal)),
            _ => Err(StatusCode::UNAUTHORIZED),
        }
    }
}

/// Pulls one cookie's value out of the `Cookie` header.
fn cookie_value(parts: &Parts, name: &str) -> Option<String> {
    let cookie_header = parts.headers.get(COOKIE)?.to_str().ok()?;

    for cookie in cookie_header.split(';') {
        let cookie = cookie.trim();
        if let Some((cookie_name, value)) = cookie.split_once('=')
            && cookie_name.trim() == name
        {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_cookie_header(header: &str) -> Parts {
        let request = Request::builder()
            .uri("/")
            .header(COOKIE, header)
            .body(())
            .unwrap();
        request.into_parts().0
    }

    #[test]
    fn test_cookie_value_parsing() {
        let parts = parts_with_cookie_header("refresh_token=abc; Authorization=xyz");
        assert_eq!(cookie_value(&parts, "refresh_token"), Some("abc".to_string()));
        assert_eq!(cookie_value(&parts, "Authorization"), Some("xyz".to_string()));
        assert_eq!(cookie_value(&parts, "missing"), None);
    }

    #[test]
    fn test_cookie_value_whitespace_and_empty() {
        let parts = parts_with_cookie_header("  refresh_token =  abc  ; empty= ");
        assert_eq!(cookie_value(&parts, "refresh_token"), Some("abc".to_string()));
        assert_eq!(cookie_value(&parts, "empty"), None);
    }
}
