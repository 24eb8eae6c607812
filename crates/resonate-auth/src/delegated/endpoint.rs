//! Third-party OAuth2 token endpoint client.
//!
//! All exchanges are form-encoded POSTs authenticated with the
//! registration's client id and secret; responses are JSON. Every call
//! carries the configured timeout so a hung provider surfaces as a typed
//! [`AuthError::TokenEndpointError`] instead of stalling a request thread.

use async_trait::async_trait;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::config::RegistrationConfig;
use crate::error::AuthError;
use crate::types::GrantType;
use crate::AuthResult;

/// Successful token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenEndpointResponse {
    /// The issued access token.
    pub access_token: String,

    /// Token type, normally "Bearer".
    #[serde(default)]
    pub token_type: Option<String>,

    /// Validity in seconds, as reported by the provider.
    pub expires_in: u64,

    /// Refresh token, when the grant produces one.
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Granted scopes.
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenEndpointResponse {
    /// Absolute expiry computed from the reported `expires_in`.
    #[must_use]
    pub fn expires_at(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc() + time::Duration::seconds(self.expires_in as i64)
    }
}

/// OAuth 2.0 error response body (RFC 6749 section 5.2).
#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Abstraction over the third-party token endpoint.
///
/// One implementation talks HTTP; tests substitute counting mocks.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Performs a `client_credentials` exchange.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenEndpointError`] on any upstream failure.
    async fn client_credentials(
        &self,
        registration: &RegistrationConfig,
    ) -> AuthResult<TokenEndpointResponse>;

    /// Exchanges an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenEndpointError`] on any upstream failure.
    async fn exchange_code(
        &self,
        registration: &RegistrationConfig,
        code: &str,
    ) -> AuthResult<TokenEndpointResponse>;

    /// Refreshes a delegated token with the provider's refresh token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ReauthorizationRequired`] when the provider
    /// rejects the grant (`invalid_grant`: consent expired or revoked) and
    /// [`AuthError::TokenEndpointError`] for transient failures.
    async fn refresh_token(
        &self,
        registration: &RegistrationConfig,
        refresh_token: &str,
    ) -> AuthResult<TokenEndpointResponse>;
}

/// Upstream failure before mapping to the crate taxonomy.
struct EndpointFailure {
    oauth_error: Option<String>,
    message: String,
}

/// HTTP implementation of [`TokenEndpoint`].
pub struct HttpTokenEndpoint {
    client: reqwest::Client,
}

impl HttpTokenEndpoint {
    /// Creates a client with the given request timeout.
    #[must_use]
    pub fn new(timeout: std::time::Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }

    /// Posts a form-encoded grant request and parses the response.
    async fn post_form(
        &self,
        registration: &RegistrationConfig,
        params: &[(&str, &str)],
    ) -> Result<TokenEndpointResponse, EndpointFailure> {
        tracing::debug!(
            registration_id = %registration.id,
            grant_type = params.first().map(|(_, v)| *v).unwrap_or(""),
            "Calling token endpoint"
        );

        let response = self
            .client
            .post(registration.token_uri.as_str())
            .basic_auth(&registration.client_id, Some(&registration.client_secret))
            .form(params)
            .send()
            .await
            .map_err(|e| EndpointFailure {
                oauth_error: None,
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if let Ok(oauth_error) = serde_json::from_str::<OAuthErrorResponse>(&body) {
                return Err(EndpointFailure {
                    message: format!(
                        "{}: {}",
                        oauth_error.error,
                        oauth_error.error_description.as_deref().unwrap_or("")
                    ),
                    oauth_error: Some(oauth_error.error),
                });
            }

            return Err(EndpointFailure {
                oauth_error: None,
                message: format!("HTTP {status}"),
            });
        }

        response
            .json::<TokenEndpointResponse>()
            .await
            .map_err(|e| EndpointFailure {
                oauth_error: None,
                message: format!("Invalid token response: {e}"),
            })
    }
}

#[async_trait]
impl TokenEndpoint for HttpTokenEndpoint {
    async fn client_credentials(
        &self,
        registration: &RegistrationConfig,
    ) -> AuthResult<TokenEndpointResponse> {
        let scope = registration.scopes.join(" ");
        let mut params = vec![("grant_type", GrantType::ClientCredentials.as_str())];
        if !scope.is_empty() {
            params.push(("scope", scope.as_str()));
        }

        self.post_form(registration, &params)
            .await
            .map_err(|f| AuthError::token_endpoint(&registration.id, f.message))
    }

    async fn exchange_code(
        &self,
        registration: &RegistrationConfig,
        code: &str,
    ) -> AuthResult<TokenEndpointResponse> {
        let params = [
            ("grant_type", GrantType::AuthorizationCode.as_str()),
            ("code", code),
            ("redirect_uri", registration.redirect_uri.as_str()),
        ];

        self.post_form(registration, &params)
            .await
            .map_err(|f| AuthError::token_endpoint(&registration.id, f.message))
    }

    async fn refresh_token(
        &self,
        registration: &RegistrationConfig,
        refresh_token: &str,
    ) -> AuthResult<TokenEndpointResponse> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];

        self.post_form(registration, &params).await.map_err(|f| {
            // invalid_grant on refresh means the consent itself is gone;
            // everything else is a transient upstream failure.
            if f.oauth_error.as_deref() == Some("invalid_grant") {
                AuthError::reauthorization_required(&registration.id)
            } else {
                AuthError::token_endpoint(&registration.id, f.message)
            }
        })
    }
}
