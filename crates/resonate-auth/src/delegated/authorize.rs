//! Authorization-code redirect construction.
//!
//! Initiating the delegated authorization-code flow means sending the user's
//! browser to the provider's authorization endpoint with a random `state`
//! value; the in-flight request is carried client-side by
//! [`crate::state::AuthorizationStateStore`] until the callback returns.

use url::Url;

use crate::config::RegistrationConfig;
use crate::state::AuthorizationRequestState;

/// Generates a random `state` value (256 bits, base64url).
#[must_use]
pub fn generate_state() -> String {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    let mut bytes = [0u8; 32];
    rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Builds the provider authorization URL and the matching in-flight state.
///
/// The returned state must be saved into the state cookie before the
/// redirect is sent, and matched against the provider's `state` parameter on
/// the callback.
#[must_use]
pub fn authorization_redirect(
    registration: &RegistrationConfig,
) -> (Url, AuthorizationRequestState) {
    let request = AuthorizationRequestState::new(registration, generate_state());

    let mut url = registration.authorization_uri.clone();
    {
        let mut params = url.query_pairs_mut();
        params.append_pair("response_type", "code");
        params.append_pair("client_id", &registration.client_id);
        params.append_pair("redirect_uri", registration.redirect_uri.as_str());
        if !registration.scopes.is_empty() {
            params.append_pair("scope", &registration.scopes.join(" "));
        }
        params.append_pair("state", &request.state);
    }

    tracing::debug!(
        registration_id = %registration.id,
        "Built authorization redirect"
    );

    (url, request)
}
