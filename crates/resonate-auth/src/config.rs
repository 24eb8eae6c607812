//! Authentication configuration.
//!
//! This module provides the configuration types for the auth subsystem:
//! local token signing and lifetimes, refresh cookie attributes, the
//! single-use authorization-state cookie, and the third-party client
//! registrations used for delegated tokens.
//!
//! # Example (TOML)
//!
//! ```toml
//! [auth]
//! issuer = "https://resonate.example.com"
//! signing_secret = "<at least 32 bytes of secret material>"
//!
//! [auth.refresh_token]
//! lifetime = "30d"
//! cookie_domain = "resonate.example.com"
//!
//! [[auth.delegated.registrations]]
//! id = "spotify"
//! client_id = "abc123"
//! client_secret = "shhh"
//! token_uri = "https://accounts.spotify.com/api/token"
//! authorization_uri = "https://accounts.spotify.com/authorize"
//! redirect_uri = "https://resonate.example.com/oauth2/callback/spotify"
//! scopes = ["user-follow-read"]
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Minimum length of the signing secret in bytes (HMAC-SHA256 key).
pub const MIN_SIGNING_SECRET_LEN: usize = 32;

/// Errors raised by startup configuration validation.
///
/// These are fatal: the process must refuse to serve rather than issue
/// unverifiable tokens.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No signing secret was configured.
    #[error("Signing secret is not configured")]
    MissingSigningSecret,

    /// The signing secret is too short to be safe for HMAC-SHA256.
    #[error("Signing secret is {actual} bytes, need at least {required}")]
    WeakSigningSecret {
        /// Configured secret length.
        actual: usize,
        /// Required minimum length.
        required: usize,
    },

    /// The refresh cookie domain is not configured.
    #[error("Refresh cookie domain is not configured")]
    MissingCookieDomain,

    /// A client registration is incomplete or inconsistent.
    #[error("Invalid registration '{id}': {reason}")]
    InvalidRegistration {
        /// The offending registration id.
        id: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// Root authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Token issuer (used in the `iss` claim). Should be the public base URL
    /// of the application.
    pub issuer: String,

    /// Shared secret for HMAC token signing. Read-only after startup.
    pub signing_secret: String,

    /// Local access token settings.
    pub access_token: AccessTokenConfig,

    /// Refresh token and refresh cookie settings.
    pub refresh_token: RefreshTokenConfig,

    /// Single-use authorization-state cookie settings.
    pub state_cookie: StateCookieConfig,

    /// Delegated third-party token settings.
    pub delegated: DelegatedConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:8080".to_string(),
            signing_secret: String::new(),
            access_token: AccessTokenConfig::default(),
            refresh_token: RefreshTokenConfig::default(),
            state_cookie: StateCookieConfig::default(),
            delegated: DelegatedConfig::default(),
        }
    }
}

impl AuthConfig {
    /// Validates the configuration at startup.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the signing secret is missing or weak,
    /// the refresh cookie domain is unset, or a registration is incomplete.
    /// All of these must abort startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signing_secret.is_empty() {
            return Err(ConfigError::MissingSigningSecret);
        }
        if self.signing_secret.len() < MIN_SIGNING_SECRET_LEN {
            return Err(ConfigError::WeakSigningSecret {
                actual: self.signing_secret.len(),
                required: MIN_SIGNING_SECRET_LEN,
            });
        }
        if self.refresh_token.cookie_domain.is_empty() {
            return Err(ConfigError::MissingCookieDomain);
        }
        for registration in &self.delegated.registrations {
            registration.validate()?;
        }
        Ok(())
    }

    /// Looks up a client registration by id.
    #[must_use]
    pub fn registration(&self, id: &str) -> Option<&RegistrationConfig> {
        self.delegated.registrations.iter().find(|r| r.id == id)
    }
}

/// Local access token settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessTokenConfig {
    /// Access token lifetime. Short: expiry is routine and handled by the
    /// refresh endpoint.
    #[serde(with = "humantime_serde")]
    pub lifetime: Duration,

    /// Name of the optional cookie carrier for the access token.
    pub cookie_name: String,
}

impl Default for AccessTokenConfig {
    fn default() -> Self {
        Self {
            lifetime: Duration::from_secs(15 * 60), // 15 minutes
            cookie_name: "Authorization".to_string(),
        }
    }
}

/// Refresh token and refresh cookie settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RefreshTokenConfig {
    /// Refresh token lifetime. Long-lived; each rotation resets it.
    #[serde(with = "humantime_serde")]
    pub lifetime: Duration,

    /// Name of the refresh cookie.
    pub cookie_name: String,

    /// Domain the refresh cookie is scoped to.
    pub cookie_domain: String,

    /// Safety margin subtracted from the lifetime for the cookie max-age,
    /// so the cookie never outlives the token it carries.
    #[serde(with = "humantime_serde")]
    pub cookie_max_age_offset: Duration,
}

impl Default for RefreshTokenConfig {
    fn default() -> Self {
        Self {
            lifetime: Duration::from_secs(30 * 24 * 3600), // 30 days
            cookie_name: "refresh_token".to_string(),
            cookie_domain: String::new(),
            cookie_max_age_offset: Duration::from_secs(60),
        }
    }
}

impl RefreshTokenConfig {
    /// Max-age for the refresh cookie: lifetime minus the safety offset.
    #[must_use]
    pub fn cookie_max_age(&self) -> Duration {
        self.lifetime.saturating_sub(self.cookie_max_age_offset)
    }
}

/// Single-use authorization-state cookie settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StateCookieConfig {
    /// Name of the state cookie.
    pub name: String,

    /// How long the in-flight authorization request stays loadable.
    #[serde(with = "humantime_serde")]
    pub max_age: Duration,
}

impl Default for StateCookieConfig {
    fn default() -> Self {
        Self {
            name: "session_state".to_string(),
            max_age: Duration::from_secs(60),
        }
    }
}

/// Delegated third-party token settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DelegatedConfig {
    /// Window before a cached token's real expiry during which it is
    /// refreshed proactively instead of handed out.
    #[serde(with = "humantime_serde")]
    pub grace_period: Duration,

    /// Timeout for outbound token-endpoint calls.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Configured client registrations.
    pub registrations: Vec<RegistrationConfig>,
}

impl Default for DelegatedConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(15),
            request_timeout: Duration::from_secs(10),
            registrations: Vec::new(),
        }
    }
}

/// A third-party OAuth2 client registration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistrationConfig {
    /// Registration id (e.g. "spotify").
    pub id: String,

    /// OAuth client id issued by the provider.
    pub client_id: String,

    /// OAuth client secret issued by the provider.
    pub client_secret: String,

    /// The provider's token endpoint.
    pub token_uri: Url,

    /// The provider's authorization endpoint (authorization-code flow).
    pub authorization_uri: Url,

    /// Redirect URI registered with the provider for the callback.
    pub redirect_uri: Url,

    /// Scopes requested from the provider.
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl RegistrationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.id.is_empty() {
            return Err(ConfigError::InvalidRegistration {
                id: "<empty>".to_string(),
                reason: "registration id is empty".to_string(),
            });
        }
        if self.client_id.is_empty() {
            return Err(ConfigError::InvalidRegistration {
                id: self.id.clone(),
                reason: "client_id is empty".to_string(),
            });
        }
        if self.client_secret.is_empty() {
            return Err(ConfigError::InvalidRegistration {
                id: self.id.clone(),
                reason: "client_secret is empty".to_string(),
            });
        }
        Ok(())
    }
}
