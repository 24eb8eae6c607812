//! Axum HTTP handlers for the collaborator-exposed auth endpoints.
//!
//! Routing belongs to the application; these handlers expect
//! [`crate::middleware::AuthState`] in the router state:
//!
//! ```ignore
//! use axum::{Router, routing::{get, post}};
//! use resonate_auth::http::{
//!     auth_check_handler, callback_handler, connect_handler, logout_handler,
//!     refresh_handler,
//! };
//!
//! let router: Router<AuthState> = Router::new()
//!     .route("/auth/refresh", get(refresh_handler).post(refresh_handler))
//!     .route("/auth/check", get(auth_check_handler))
//!     .route("/auth/logout", post(logout_handler))
//!     .route("/oauth2/connect/{registration_id}", get(connect_handler))
//!     .route("/oauth2/callback/{registration_id}", get(callback_handler));
//! ```

pub mod connect;
pub mod refresh;

pub use connect::{callback_handler, connect_handler, CallbackParams};
pub use refresh::{
    auth_check_handler, logout_handler, refresh_handler, AuthCheckResponse, LoginResponse,
};

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::AuthError;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            e if e.is_unauthenticated() => StatusCode::UNAUTHORIZED,
            AuthError::UnknownRegistration { .. } | AuthError::NoAuthorizationFound { .. } => {
                StatusCode::NOT_FOUND
            }
            AuthError::ReauthorizationRequired { .. } => StatusCode::CONFLICT,
            AuthError::TokenEndpointError { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.category().to_string(),
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}
