//! # resonate-auth
//!
//! Authentication and token lifecycle management for the resonate release
//! tracker.
//!
//! This crate provides:
//! - Signed bearer token issuance and verification (shared-secret JWT)
//! - Access token resolution from inbound requests (header or cookie)
//! - Refresh session persistence with atomic single-use rotation
//! - Delegated OAuth2 token acquisition against the third-party music API
//!   (client-credentials and authorization-code grants)
//! - Single-use, cookie-encoded authorization-request state
//! - Execution-context-aware selection of the legal token provider
//!
//! ## Trust domains
//!
//! Two distinct trust domains meet here: first-party session auth (access
//! and refresh tokens this application signs itself) and third-party
//! delegated auth (tokens the music provider issues for calls made on the
//! application's or a user's behalf). They share nothing but the principal.
//!
//! ## Modules
//!
//! - [`config`] - Configuration and startup validation
//! - [`token`] - Token codec, access issuance, refresh rotation
//! - [`delegated`] - Third-party token acquisition and caching
//! - [`state`] - Single-use authorization-request cookie state
//! - [`context`] - Execution context and provider selection
//! - [`storage`] - Storage traits (backends live in separate crates)
//! - [`middleware`] - Axum extractors
//! - [`http`] - Axum handlers for the auth endpoints

pub mod config;
pub mod context;
pub mod delegated;
pub mod error;
pub mod http;
pub mod middleware;
pub mod state;
pub mod storage;
pub mod token;
pub mod types;

pub use config::{AuthConfig, ConfigError, RegistrationConfig};
pub use context::{ExecutionContext, ManagerSelector};
pub use delegated::{DelegatedTokenProvider, HttpTokenEndpoint, TokenEndpoint};
pub use error::{AuthError, ErrorCategory};
pub use http::{
    AuthCheckResponse, CallbackParams, LoginResponse, auth_check_handler, callback_handler,
    connect_handler, logout_handler, refresh_handler,
};
pub use middleware::{AuthState, CurrentPrincipal, RequirePrincipal};
pub use state::{AuthorizationRequestState, AuthorizationStateStore};
pub use storage::{DelegatedAuthorizationStorage, PrincipalStore, RefreshSessionStorage};
pub use token::{AccessTokenIssuer, Claims, RefreshTokenManager, SigningKey, TokenCodec};
pub use types::{DelegatedAuthorization, GrantType, Principal, RefreshSession, SYSTEM_PRINCIPAL};

/// Type alias for auth results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use resonate_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{AuthConfig, ConfigError, RegistrationConfig};
    pub use crate::context::{ExecutionContext, ManagerSelector};
    pub use crate::delegated::{DelegatedTokenProvider, HttpTokenEndpoint, TokenEndpoint};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::http::{
        AuthCheckResponse, CallbackParams, LoginResponse, auth_check_handler, callback_handler,
        connect_handler, logout_handler, refresh_handler,
    };
    pub use crate::middleware::{AuthState, CurrentPrincipal, RequirePrincipal};
    pub use crate::state::{AuthorizationRequestState, AuthorizationStateStore};
    pub use crate::storage::{
        DelegatedAuthorizationStorage, PrincipalStore, RefreshSessionStorage,
    };
    pub use crate::token::{
        AccessTokenIssuer, Claims, RefreshTokenManager, SigningKey, TokenCodec,
    };
    pub use crate::types::{
        DelegatedAuthorization, GrantType, Principal, RefreshSession, SYSTEM_PRINCIPAL,
    };
}
