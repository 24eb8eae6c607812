//! Refresh session issuance, rotation and revocation.
//!
//! Each login persists one [`RefreshSession`] row and hands the client a
//! signed token whose subject is the session id, carried in an http-only,
//! domain-scoped cookie. Presenting the token on the refresh endpoint
//! exchanges it for a new access token and a rotated refresh token: the row
//! keeps its id but its stored hash is replaced atomically, so the old
//! string becomes permanently invalid even before its embedded expiry.
//! A second use of a consumed string is an anomaly signal and fails closed.

use std::sync::Arc;

use cookie::{Cookie, SameSite};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::RefreshTokenConfig;
use crate::error::AuthError;
use crate::storage::{PrincipalStore, RefreshSessionStorage};
use crate::token::access::AccessTokenIssuer;
use crate::token::codec::TokenCodec;
use crate::types::{Principal, RefreshSession};
use crate::AuthResult;

/// A freshly created refresh session.
#[derive(Debug)]
pub struct IssuedRefreshToken {
    /// Id of the persisted session row.
    pub session_id: Uuid,

    /// The signed refresh token string.
    pub token: String,

    /// Cookie carrying the token.
    pub cookie: Cookie<'static>,
}

/// Result of a successful refresh: new access token plus rotated refresh
/// token. The old refresh string is invalid from this point on.
#[derive(Debug)]
pub struct RefreshedTokens {
    /// The session's owning principal.
    pub principal: Principal,

    /// Newly issued access token.
    pub access_token: String,

    /// Rotated refresh token string.
    pub refresh_token: String,

    /// Cookie carrying the rotated token (same name/path/domain, new value,
    /// reset max-age).
    pub cookie: Cookie<'static>,
}

/// Manages the refresh session lifecycle:
/// `Issued -> (valid) -> Rotated -> Issued'` or
/// `Issued -> (expired|revoked) -> Terminated`.
pub struct RefreshTokenManager {
    codec: Arc<TokenCodec>,
    access_issuer: Arc<AccessTokenIssuer>,
    sessions: Arc<dyn RefreshSessionStorage>,
    principals: Arc<dyn PrincipalStore>,
    config: RefreshTokenConfig,
}

impl RefreshTokenManager {
    /// Creates a new manager.
    #[must_use]
    pub fn new(
        codec: Arc<TokenCodec>,
        access_issuer: Arc<AccessTokenIssuer>,
        sessions: Arc<dyn RefreshSessionStorage>,
        principals: Arc<dyn PrincipalStore>,
        config: RefreshTokenConfig,
    ) -> Self {
        Self {
            codec,
            access_issuer,
            sessions,
            principals,
            config,
        }
    }

    /// Name of the refresh cookie.
    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.config.cookie_name
    }

    /// Creates a new refresh session for a verified principal.
    ///
    /// # Errors
    ///
    /// Returns an error if signing or persistence fails.
    pub async fn create_session(&self, principal: &Principal) -> AuthResult<IssuedRefreshToken> {
        let session_id = Uuid::new_v4();
        let token = self
            .codec
            .issue(&session_id.to_string(), self.config.lifetime)?;

        let now = OffsetDateTime::now_utc();
        let session = RefreshSession {
            id: session_id,
            token_hash: RefreshSession::hash_token(&token),
            principal_public_id: principal.public_id.clone(),
            created_at: now,
            expires_at: now + lifetime_as_time(self.config.lifetime),
        };
        self.sessions.create(&session).await?;

        tracing::info!(
            session_id = %session_id,
            principal = %principal.public_id,
            "Refresh session created"
        );

        let cookie = self.build_cookie(&token);
        Ok(IssuedRefreshToken {
            session_id,
            token,
            cookie,
        })
    }

    /// Exchanges a valid refresh token for a new access token and a rotated
    /// refresh token.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidToken`] - signature/shape verification failed
    /// - [`AuthError::SessionNotFound`] - no session for the subject, the
    ///   presented string was already rotated away (possible replay), or the
    ///   owning principal is gone/disabled
    /// - [`AuthError::Expired`] - the token's embedded expiry has passed
    ///
    /// All of these are routine operational states; callers treat them as
    /// "unauthenticated, clear the cookie".
    pub async fn refresh(&self, old_token: &str) -> AuthResult<RefreshedTokens> {
        // 1. Signature first, tolerating expired claims so that "expired"
        //    and "forged" stay distinguishable.
        let claims = self.codec.verify(old_token).map_err(|e| {
            tracing::debug!(error = %e, "Refresh token failed verification");
            AuthError::invalid_token(e.to_string())
        })?;

        let session_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AuthError::invalid_token("Refresh token subject is not a session id"))?;

        // 2. Session lookup. Absent covers rotated-away, revoked and forged.
        let session = self
            .sessions
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| {
                tracing::debug!(session_id = %session_id, "Refresh session not found");
                AuthError::SessionNotFound
            })?;

        let presented_hash = RefreshSession::hash_token(old_token);
        if session.token_hash != presented_hash {
            // The session exists but this string was already consumed:
            // distinct log, same client-visible failure.
            tracing::warn!(
                session_id = %session_id,
                "Rotated-away refresh token presented; possible replay"
            );
            return Err(AuthError::SessionNotFound);
        }

        // 3. Expiry from the claims, now that the token is known genuine.
        if claims.is_expired() {
            tracing::debug!(session_id = %session_id, "Refresh token expired");
            return Err(AuthError::Expired);
        }

        let principal = match self
            .principals
            .find_by_public_id(&session.principal_public_id)
            .await?
        {
            Some(principal) if principal.enabled => principal,
            _ => {
                tracing::warn!(
                    session_id = %session_id,
                    principal = %session.principal_public_id,
                    "Refresh session owner missing or disabled"
                );
                return Err(AuthError::SessionNotFound);
            }
        };

        // 4. New access token for the owning principal.
        let access_token = self.access_issuer.issue_for(&principal)?;

        // 5. Rotation: same row id, new signed string, CAS on the old hash.
        let new_refresh_token = self
            .codec
            .issue(&session_id.to_string(), self.config.lifetime)?;
        let new_hash = RefreshSession::hash_token(&new_refresh_token);
        let new_expires_at =
            OffsetDateTime::now_utc() + lifetime_as_time(self.config.lifetime);

        let rotated = self
            .sessions
            .rotate(session_id, &presented_hash, &new_hash, new_expires_at)
            .await?;
        if !rotated {
            tracing::warn!(
                session_id = %session_id,
                "Lost refresh rotation race; failing closed"
            );
            return Err(AuthError::SessionNotFound);
        }

        tracing::debug!(session_id = %session_id, "Refresh session rotated");

        // 6. Same cookie name/path/domain, new value, reset max-age.
        let cookie = self.build_cookie(&new_refresh_token);
        Ok(RefreshedTokens {
            principal,
            access_token,
            refresh_token: new_refresh_token,
            cookie,
        })
    }

    /// Returns `true` if the presented refresh token currently validates:
    /// genuine signature, unexpired, and still the session's current string.
    pub async fn validate(&self, token: &str) -> bool {
        self.current_session(token).await.is_some()
    }

    /// Resolves the owning principal of a currently-valid refresh token.
    ///
    /// Returns `None` for anything that would not validate, and for owners
    /// that are missing or disabled.
    pub async fn resolve_owner(&self, token: &str) -> Option<Principal> {
        let session = self.current_session(token).await?;
        match self
            .principals
            .find_by_public_id(&session.principal_public_id)
            .await
        {
            Ok(Some(principal)) if principal.enabled => Some(principal),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Principal lookup failed");
                None
            }
        }
    }

    /// The session behind a token, if the token is its current valid string.
    async fn current_session(&self, token: &str) -> Option<RefreshSession> {
        let claims = self.codec.verify(token).ok()?;
        if claims.is_expired() {
            return None;
        }
        let session_id = Uuid::parse_str(&claims.sub).ok()?;
        match self.sessions.find_by_id(session_id).await {
            Ok(Some(session)) if session.token_hash == RefreshSession::hash_token(token) => {
                Some(session)
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Refresh session lookup failed");
                None
            }
        }
    }

    /// Deletes all refresh sessions owned by a principal (logout everywhere,
    /// account deletion).
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn revoke(&self, principal: &Principal) -> AuthResult<u64> {
        let deleted = self
            .sessions
            .delete_by_principal(&principal.public_id)
            .await?;
        tracing::info!(
            principal = %principal.public_id,
            sessions = deleted,
            "Refresh sessions revoked"
        );
        Ok(deleted)
    }

    /// Builds the refresh cookie for a token value.
    fn build_cookie(&self, value: &str) -> Cookie<'static> {
        let max_age = self.config.cookie_max_age();
        Cookie::build((self.config.cookie_name.clone(), value.to_string()))
            .http_only(true)
            .secure(true)
            .same_site(SameSite::Strict)
            .path("/")
            .domain(self.config.cookie_domain.clone())
            .max_age(lifetime_as_time(max_age))
            .build()
    }

    /// Builds the removal cookie used when the caller must be logged out.
    #[must_use]
    pub fn clear_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.config.cookie_name.clone(), ""))
            .http_only(true)
            .secure(true)
            .same_site(SameSite::Strict)
            .path("/")
            .domain(self.config.cookie_domain.clone())
            .max_age(time::Duration::ZERO)
            .build()
    }
}

fn lifetime_as_time(lifetime: std::time::Duration) -> time::Duration {
    time::Duration::seconds(lifetime.as_secs() as i64)
}
