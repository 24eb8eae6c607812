//! Delegated third-party token acquisition.
//!
//! Business code calls the third-party music API with bearer tokens obtained
//! here: application-level tokens through the client-credentials grant, and
//! per-user tokens through the authorization-code grant. Tokens are cached
//! per `(registration, principal)` and refreshed proactively inside a grace
//! window before their reported expiry.

pub mod authorize;
pub mod endpoint;
pub mod provider;

pub use authorize::{authorization_redirect, generate_state};
pub use endpoint::{HttpTokenEndpoint, TokenEndpoint, TokenEndpointResponse};
pub use provider::DelegatedTokenProvider;
