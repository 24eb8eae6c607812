//! Authentication and token lifecycle error types.
//!
//! This module defines all error types that can occur while issuing,
//! verifying, rotating or delegating tokens. Every failure surfaced to
//! business logic is one of these typed kinds; cryptographic and persistence
//! failures are logged before conversion and never silently swallowed.

use std::fmt;

/// Errors that can occur during token and delegated-authorization operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The token signature does not match the signing key (tampering).
    #[error("Invalid token signature")]
    InvalidSignature,

    /// The token string could not be parsed at all.
    #[error("Malformed token: {message}")]
    Malformed {
        /// Description of why the token is unparseable.
        message: String,
    },

    /// The token is structurally valid but unusable (wrong issuer, bad
    /// subject, wrong shape of claims).
    #[error("Invalid token: {message}")]
    InvalidToken {
        /// Description of why the token is invalid.
        message: String,
    },

    /// The token's embedded expiry has passed.
    #[error("Token expired")]
    Expired,

    /// No refresh session exists for the presented token.
    ///
    /// Covers rotated-away, revoked and forged session ids. Client-visible
    /// behavior is identical to [`AuthError::Expired`] (force re-login), but
    /// callers log this distinctly because it can indicate token replay.
    #[error("Refresh session not found")]
    SessionNotFound,

    /// No delegated authorization exists for this registration and principal.
    #[error("No authorization found for registration '{registration_id}'")]
    NoAuthorizationFound {
        /// The client registration that was queried.
        registration_id: String,
    },

    /// The third-party token endpoint failed (network, timeout, 5xx).
    ///
    /// Transient: callers may retry or degrade gracefully. Any cached token
    /// is left in place.
    #[error("Token endpoint error for registration '{registration_id}': {message}")]
    TokenEndpointError {
        /// The client registration whose endpoint failed.
        registration_id: String,
        /// Description of the upstream failure.
        message: String,
    },

    /// The user's consent has expired or been revoked; the authorization-code
    /// flow must be run again.
    ///
    /// User-actionable, not a bug: the UI should prompt for re-consent
    /// instead of retrying.
    #[error("Reauthorization required for registration '{registration_id}'")]
    ReauthorizationRequired {
        /// The client registration needing new consent.
        registration_id: String,
    },

    /// A user-delegated token was requested from a context with no end user.
    #[error("No principal in execution context")]
    NoPrincipalInContext,

    /// The registration id is not configured.
    #[error("Unknown registration '{registration_id}'")]
    UnknownRegistration {
        /// The unconfigured registration id.
        registration_id: String,
    },

    /// An error occurred while storing or retrieving auth data.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The auth configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `Malformed` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Creates a new `NoAuthorizationFound` error.
    #[must_use]
    pub fn no_authorization(registration_id: impl Into<String>) -> Self {
        Self::NoAuthorizationFound {
            registration_id: registration_id.into(),
        }
    }

    /// Creates a new `TokenEndpointError`.
    #[must_use]
    pub fn token_endpoint(
        registration_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::TokenEndpointError {
            registration_id: registration_id.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ReauthorizationRequired` error.
    #[must_use]
    pub fn reauthorization_required(registration_id: impl Into<String>) -> Self {
        Self::ReauthorizationRequired {
            registration_id: registration_id.into(),
        }
    }

    /// Creates a new `UnknownRegistration` error.
    #[must_use]
    pub fn unknown_registration(registration_id: impl Into<String>) -> Self {
        Self::UnknownRegistration {
            registration_id: registration_id.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this failure means the caller is simply not
    /// authenticated (degrade, force re-login, never crash the request).
    #[must_use]
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            Self::InvalidSignature
                | Self::Malformed { .. }
                | Self::InvalidToken { .. }
                | Self::Expired
                | Self::SessionNotFound
        )
    }

    /// Returns `true` if this is a transient external-service failure that
    /// the caller may retry.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TokenEndpointError { .. })
    }

    /// Returns `true` if this is an expected, user-actionable state rather
    /// than a fault.
    #[must_use]
    pub fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            Self::ReauthorizationRequired { .. } | Self::NoAuthorizationFound { .. }
        )
    }

    /// Returns `true` if this is a server-side fault (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Storage { .. } | Self::Configuration { .. } | Self::Internal { .. }
        )
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidSignature
            | Self::Malformed { .. }
            | Self::InvalidToken { .. }
            | Self::Expired => ErrorCategory::Token,
            Self::SessionNotFound => ErrorCategory::Session,
            Self::NoAuthorizationFound { .. }
            | Self::TokenEndpointError { .. }
            | Self::ReauthorizationRequired { .. }
            | Self::UnknownRegistration { .. } => ErrorCategory::Delegated,
            Self::NoPrincipalInContext => ErrorCategory::Context,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of auth errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Local bearer token validation errors.
    Token,
    /// Refresh session errors.
    Session,
    /// Delegated third-party token errors.
    Delegated,
    /// Execution-context misuse.
    Context,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token => write!(f, "token"),
            Self::Session => write!(f, "session"),
            Self::Delegated => write!(f, "delegated"),
            Self::Context => write!(f, "context"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
