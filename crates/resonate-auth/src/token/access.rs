//! Access token issuance and request resolution.
//!
//! Inbound requests carry the access token either in the
//! `Authorization: Bearer <token>` header or, as a fallback, in a cookie of
//! the configured name. Resolution is never fatal to the request pipeline:
//! every failure (missing, malformed, expired, unknown subject) leaves the
//! request anonymous so downstream authorization can reject it uniformly.

use std::sync::Arc;

use crate::config::AccessTokenConfig;
use crate::storage::PrincipalStore;
use crate::token::codec::TokenCodec;
use crate::types::Principal;
use crate::AuthResult;

/// Issues short-lived access tokens and resolves them back to principals.
pub struct AccessTokenIssuer {
    codec: Arc<TokenCodec>,
    principals: Arc<dyn PrincipalStore>,
    config: AccessTokenConfig,
}

impl AccessTokenIssuer {
    /// Creates a new issuer.
    #[must_use]
    pub fn new(
        codec: Arc<TokenCodec>,
        principals: Arc<dyn PrincipalStore>,
        config: AccessTokenConfig,
    ) -> Self {
        Self {
            codec,
            principals,
            config,
        }
    }

    /// Name of the cookie carrier for the access token.
    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.config.cookie_name
    }

    /// Issues an access token for a verified principal.
    ///
    /// # Errors
    ///
    /// Returns an error only if token encoding fails.
    pub fn issue_for(&self, principal: &Principal) -> AuthResult<String> {
        self.codec
            .issue(&principal.public_id, self.config.lifetime)
    }

    /// Resolves the request's bearer token to a principal.
    ///
    /// Prefers the `Authorization` header; falls back to the cookie value.
    /// Returns `None` for anonymous requests - verification failures are
    /// logged, never propagated.
    pub async fn resolve_from_request(
        &self,
        authorization_header: Option<&str>,
        cookie_value: Option<&str>,
    ) -> Option<Principal> {
        let token = authorization_header
            .and_then(|header| header.strip_prefix("Bearer "))
            .filter(|t| !t.is_empty())
            .or(cookie_value.filter(|t| !t.is_empty()))?;

        self.resolve_token(token).await
    }

    /// Verifies one token string and loads its principal.
    async fn resolve_token(&self, token: &str) -> Option<Principal> {
        let claims = match self.codec.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "Failed to verify access token");
                return None;
            }
        };

        if claims.is_expired() {
            tracing::debug!(jti = %claims.jti, "Access token expired");
            return None;
        }

        let principal = match self.principals.find_by_public_id(&claims.sub).await {
            Ok(Some(principal)) => principal,
            Ok(None) => {
                tracing::debug!(subject = %claims.sub, "Unknown token subject");
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, subject = %claims.sub, "Principal lookup failed");
                return None;
            }
        };

        if !principal.enabled {
            tracing::debug!(subject = %claims.sub, "Disabled principal");
            return None;
        }

        Some(principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthError;
    use crate::token::codec::SigningKey;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::RwLock;
    use std::time::Duration;

    /// Mock principal store for testing.
    struct MockPrincipalStore {
        principals: RwLock<HashMap<String, Principal>>,
        fail: bool,
    }

    impl MockPrincipalStore {
        fn new() -> Self {
            Self {
                principals: RwLock::new(HashMap::new()),
                fail: false,
            }
        }

        fn with(principal: Principal) -> Arc<Self> {
            let store = Self::new();
            store
                .principals
                .write()
                .unwrap()
                .insert(principal.public_id.clone(), principal);
            Arc::new(store)
        }
    }

    #[async_trait]
    impl PrincipalStore for MockPrincipalStore {
        async fn find_by_public_id(&self, public_id: &str) -> AuthResult<Option<Principal>> {
            if self.fail {
                return Err(AuthError::storage("store down"));
            }
            Ok(self.principals.read().unwrap().get(public_id).cloned())
        }

        async fn find_by_username(&self, username: &str) -> AuthResult<Option<Principal>> {
            Ok(self
                .principals
                .read()
                .unwrap()
                .values()
                .find(|p| p.username == username)
                .cloned())
        }
    }

    fn test_codec() -> Arc<TokenCodec> {
        let key = SigningKey::from_secret("0123456789abcdef0123456789abcdef").unwrap();
        Arc::new(TokenCodec::new(&key, "https://resonate.example.com"))
    }

    fn issuer_with(store: Arc<MockPrincipalStore>) -> AccessTokenIssuer {
        AccessTokenIssuer::new(test_codec(), store, AccessTokenConfig::default())
    }

    #[tokio::test]
    async fn test_issue_and_resolve_from_header() {
        let principal = Principal::new("u1", "alice").with_role("USER");
        let issuer = issuer_with(MockPrincipalStore::with(principal.clone()));

        let token = issuer.issue_for(&principal).unwrap();
        let header = format!("Bearer {token}");

        let resolved = issuer.resolve_from_request(Some(&header), None).await;
        assert_eq!(resolved, Some(principal));
    }

    #[tokio::test]
    async fn test_resolve_from_cookie_fallback() {
        let principal = Principal::new("u1", "alice");
        let issuer = issuer_with(MockPrincipalStore::with(principal.clone()));

        let token = issuer.issue_for(&principal).unwrap();
        let resolved = issuer.resolve_from_request(None, Some(&token)).await;
        assert_eq!(resolved, Some(principal));
    }

    #[tokio::test]
    async fn test_header_preferred_over_cookie() {
        let alice = Principal::new("u1", "alice");
        let bob = Principal::new("u2", "bob");
        let store = MockPrincipalStore::with(alice.clone());
        store
            .principals
            .write()
            .unwrap()
            .insert("u2".to_string(), bob.clone());
        let issuer = issuer_with(store);

        let header = format!("Bearer {}", issuer.issue_for(&alice).unwrap());
        let cookie = issuer.issue_for(&bob).unwrap();

        let resolved = issuer
            .resolve_from_request(Some(&header), Some(&cookie))
            .await;
        assert_eq!(resolved, Some(alice));
    }

    #[tokio::test]
    async fn test_expired_token_is_anonymous() {
        let principal = Principal::new("u1", "alice");
        let store = MockPrincipalStore::with(principal.clone());
        let issuer = AccessTokenIssuer::new(
            test_codec(),
            store,
            AccessTokenConfig {
                lifetime: Duration::from_secs(0),
                ..AccessTokenConfig::default()
            },
        );

        let header = format!("Bearer {}", issuer.issue_for(&principal).unwrap());
        assert!(issuer.resolve_from_request(Some(&header), None).await.is_none());
    }

    #[tokio::test]
    async fn test_garbage_header_is_anonymous() {
        let issuer = issuer_with(Arc::new(MockPrincipalStore::new()));

        assert!(issuer.resolve_from_request(None, None).await.is_none());
        assert!(
            issuer
                .resolve_from_request(Some("Bearer not-a-token"), None)
                .await
                .is_none()
        );
        assert!(
            issuer
                .resolve_from_request(Some("Basic dXNlcjpwdw=="), None)
                .await
                .is_none()
        );
        assert!(issuer.resolve_from_request(Some("Bearer "), None).await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_subject_is_anonymous() {
        let issuer = issuer_with(Arc::new(MockPrincipalStore::new()));
        let token = issuer.issue_for(&Principal::new("ghost", "ghost")).unwrap();

        assert!(
            issuer
                .resolve_from_request(None, Some(&token))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_disabled_principal_is_anonymous() {
        let mut principal = Principal::new("u1", "alice");
        principal.enabled = false;
        let issuer = issuer_with(MockPrincipalStore::with(principal.clone()));

        let token = issuer.issue_for(&principal).unwrap();
        assert!(
            issuer
                .resolve_from_request(None, Some(&token))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_store_failure_is_anonymous_not_fatal() {
        let principal = Principal::new("u1", "alice");
        let mut store = MockPrincipalStore::new();
        store.fail = true;
        let store = Arc::new(store);
        let issuer = issuer_with(store);

        let token = issuer.issue_for(&principal).unwrap();
        assert!(
            issuer
                .resolve_from_request(None, Some(&token))
                .await
                .is_none()
        );
    }
}
