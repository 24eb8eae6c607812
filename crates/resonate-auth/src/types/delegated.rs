//! Delegated authorization domain types.
//!
//! A delegated authorization caches a third-party access token obtained for
//! one client registration on behalf of one principal. Client-credentials
//! grants share a single system principal; authorization-code grants hold
//! one row per user.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Principal key shared by all client-credentials authorizations.
pub const SYSTEM_PRINCIPAL: &str = "system";

/// The OAuth2 grant type a delegated authorization was obtained with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Application-level grant; the principal is the system itself.
    ClientCredentials,
    /// Per-user grant obtained through the authorization-code redirect flow.
    AuthorizationCode,
}

impl GrantType {
    /// Returns the grant type string used on the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientCredentials => "client_credentials",
            Self::AuthorizationCode => "authorization_code",
        }
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A cached third-party authorization for `(registration_id, principal_key)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegatedAuthorization {
    /// The client registration this authorization belongs to.
    pub registration_id: String,

    /// Grant type the authorization was obtained with.
    pub grant_type: GrantType,

    /// Owning principal: [`SYSTEM_PRINCIPAL`] for client-credentials,
    /// the user's public id for authorization-code.
    pub principal_key: String,

    /// The cached third-party access token.
    pub access_token: String,

    /// Third-party refresh token, when the provider issued one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// When the cached access token expires, as reported by the provider.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl DelegatedAuthorization {
    /// Returns `true` once the token is inside the grace window before its
    /// expiry and must be refreshed before being handed out.
    #[must_use]
    pub fn needs_refresh(&self, grace_period: std::time::Duration) -> bool {
        let grace = time::Duration::try_from(grace_period).unwrap_or(time::Duration::ZERO);
        OffsetDateTime::now_utc() > self.expires_at - grace
    }
}
