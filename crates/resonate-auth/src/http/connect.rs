//! Delegated authorization-code handshake handlers.
//!
//! `connect` sends the signed-in user to the provider's authorization
//! endpoint with the in-flight request saved in the single-use state cookie;
//! `callback` consumes that state exactly once, matches the returned `state`
//! parameter against it, exchanges the code and persists the per-user
//! authorization.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::context::ExecutionContext;
use crate::delegated::authorize::authorization_redirect;
use crate::middleware::{AuthState, RequirePrincipal};

/// Query parameters the provider sends to the callback.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    /// Authorization code, on success.
    pub code: Option<String>,

    /// Echo of the `state` value from the authorization request.
    pub state: Option<String>,

    /// Provider error code, when the user denied or the request failed.
    pub error: Option<String>,
}

/// Initiates the authorization-code flow for a registration.
pub async fn connect_handler(
    State(state): State<AuthState>,
    Path(registration_id): Path<String>,
    RequirePrincipal(principal): RequirePrincipal,
    jar: CookieJar,
) -> Response {
    let Some(registration) = state.config.registration(&registration_id) else {
        tracing::debug!(registration_id = %registration_id, "Unknown registration");
        return StatusCode::NOT_FOUND.into_response();
    };

    let (url, request) = authorization_redirect(registration);

    tracing::info!(
        registration_id = %registration_id,
        principal = %principal.public_id,
        "Starting delegated authorization"
    );

    match state.state_store.save(jar, &request) {
        Ok(jar) => (jar, Redirect::temporary(url.as_str())).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Completes the authorization-code flow.
///
/// The state cookie is removed (not loaded) up front so the attempt cannot
/// be replayed, success or failure. A missing, corrupt or mismatched state
/// is an invalid request, not a system fault.
pub async fn callback_handler(
    State(state): State<AuthState>,
    Path(registration_id): Path<String>,
    Query(params): Query<CallbackParams>,
    RequirePrincipal(principal): RequirePrincipal,
    jar: CookieJar,
) -> Response {
    let (jar, saved) = state.state_store.remove(jar);

    let Some(saved) = saved else {
        tracing::debug!(registration_id = %registration_id, "Callback without usable state");
        return (jar, StatusCode::BAD_REQUEST).into_response();
    };

    if saved.registration_id != registration_id {
        tracing::debug!(
            registration_id = %registration_id,
            saved = %saved.registration_id,
            "Callback registration does not match saved state"
        );
        return (jar, StatusCode::BAD_REQUEST).into_response();
    }

    if let Some(error) = params.error {
        tracing::info!(
            registration_id = %registration_id,
            error = %error,
            "Provider declined authorization"
        );
        return (jar, StatusCode::BAD_REQUEST).into_response();
    }

    // Anti-forgery: the provider must echo the exact state value we sent.
    if params.state.as_deref() != Some(saved.state.as_str()) {
        tracing::warn!(
            registration_id = %registration_id,
            "Callback state mismatch; possible cross-site forgery"
        );
        return (jar, StatusCode::BAD_REQUEST).into_response();
    }

    let Some(code) = params.code else {
        return (jar, StatusCode::BAD_REQUEST).into_response();
    };

    let context = ExecutionContext::Interactive(principal.clone());
    let provider = state.selector.select(&context);

    match provider
        .complete_authorization(&registration_id, &principal, &code)
        .await
    {
        Ok(()) => (jar, Redirect::to("/")).into_response(),
        Err(e) => (jar, e).into_response(),
    }
}
