//! Signed bearer token encoding and verification.
//!
//! Tokens are compact, self-contained JWTs signed with a process-wide shared
//! secret (HMAC-SHA256). The codec is a pure function of its inputs and the
//! key: no storage, no clock-dependent acceptance. Expiry is deliberately
//! NOT checked here - callers decide whether expired claims are acceptable
//! (the refresh flow inspects claims of an expired-looking token to
//! distinguish "expired" from "forged").

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::{ConfigError, MIN_SIGNING_SECRET_LEN};
use crate::error::AuthError;
use crate::AuthResult;

/// The process-wide signing secret, validated at construction.
///
/// Injected explicitly wherever signing or verification happens; read-only
/// after startup. Construction fails on weak material, which makes signing
/// misconfiguration fatal at startup instead of per-request.
#[derive(Clone)]
pub struct SigningKey {
    secret: Vec<u8>,
}

impl SigningKey {
    /// Creates a signing key from secret material.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSigningSecret`] for empty material and
    /// [`ConfigError::WeakSigningSecret`] below the minimum length.
    pub fn from_secret(secret: impl Into<Vec<u8>>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(ConfigError::MissingSigningSecret);
        }
        if secret.len() < MIN_SIGNING_SECRET_LEN {
            return Err(ConfigError::WeakSigningSecret {
                actual: secret.len(),
                required: MIN_SIGNING_SECRET_LEN,
            });
        }
        Ok(Self { secret })
    }
}

impl std::fmt::Debug for SigningKey {
    // Never expose the secret through Debug output.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey").finish_non_exhaustive()
    }
}

/// Claims carried by every locally issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: a principal public id, or a refresh session id.
    pub sub: String,

    /// Issuer (the application base URL).
    pub iss: String,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Unique token id, fresh per issuance.
    pub jti: String,
}

impl Claims {
    /// The expiry as an [`OffsetDateTime`].
    ///
    /// # Panics
    ///
    /// Never panics for timestamps produced by [`TokenCodec::issue`].
    #[must_use]
    pub fn expires_at(&self) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(self.exp)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }

    /// Returns `true` if the embedded expiry has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc().unix_timestamp() >= self.exp
    }
}

/// Signs and verifies compact bearer tokens against the shared secret.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl TokenCodec {
    /// Creates a codec for the given key and issuer.
    #[must_use]
    pub fn new(key: &SigningKey, issuer: impl Into<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(&key.secret),
            decoding_key: DecodingKey::from_secret(&key.secret),
            issuer: issuer.into(),
        }
    }

    /// Returns the issuer claim value.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Issues a signed token for `subject` valid for `ttl`.
    ///
    /// Every call stamps a fresh random `jti`; ids are never reused.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] if encoding fails.
    pub fn issue(&self, subject: &str, ttl: std::time::Duration) -> AuthResult<String> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            iss: self.issuer.clone(),
            iat: now,
            exp: now + ttl.as_secs() as i64,
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::internal(format!("Failed to encode token: {e}")))
    }

    /// Verifies the signature and shape of a token, returning its claims.
    ///
    /// Expiry is NOT checked here; use [`Claims::is_expired`] when expired
    /// claims are unacceptable.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidSignature`] on tampering,
    /// [`AuthError::Malformed`] when the string is not parseable, and
    /// [`AuthError::InvalidToken`] for wrong issuer or claim shape.
    pub fn verify(&self, token: &str) -> AuthResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.validate_exp = false;
        validation.validate_aud = false;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(map_jwt_error)
    }
}

/// Maps `jsonwebtoken` errors onto the crate taxonomy.
fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;

    match err.kind() {
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidIssuer
        | ErrorKind::InvalidSubject
        | ErrorKind::InvalidAudience
        | ErrorKind::MissingRequiredClaim(_) => AuthError::invalid_token(err.to_string()),
        _ => AuthError::malformed(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_key() -> SigningKey {
        SigningKey::from_secret("0123456789abcdef0123456789abcdef").unwrap()
    }

    fn test_codec() -> TokenCodec {
        TokenCodec::new(&test_key(), "https://resonate.example.com")
    }

    #[test]
    fn test_signing_key_rejects_weak_material() {
        assert!(matches!(
            SigningKey::from_secret(""),
            Err(ConfigError::MissingSigningSecret)
        ));
        assert!(matches!(
            SigningKey::from_secret("short"),
            Err(ConfigError::WeakSigningSecret { .. })
        ));
        assert!(SigningKey::from_secret("0123456789abcdef0123456789abcdef").is_ok());
    }

    #[test]
    fn test_signing_key_debug_hides_secret() {
        let key = test_key();
        let debug = format!("{key:?}");
        assert!(!debug.contains("0123456789abcdef"));
    }

    #[test]
    fn test_round_trip() {
        let codec = test_codec();
        let token = codec.issue("u1", Duration::from_secs(900)).unwrap();

        let claims = codec.verify(&token).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.iss, "https://resonate.example.com");
        assert!(!claims.is_expired());
        assert!(claims.exp - claims.iat == 900);
    }

    #[test]
    fn test_jti_never_reused() {
        let codec = test_codec();
        let a = codec.verify(&codec.issue("u1", Duration::from_secs(60)).unwrap()).unwrap();
        let b = codec.verify(&codec.issue("u1", Duration::from_secs(60)).unwrap()).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_verify_does_not_check_expiry() {
        let codec = test_codec();
        let token = codec.issue("u1", Duration::from_secs(0)).unwrap();

        // Signature still verifies; only the claims say expired.
        let claims = codec.verify(&token).unwrap();
        assert!(claims.is_expired());
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let codec = test_codec();
        let token = codec.issue("u1", Duration::from_secs(900)).unwrap();

        // Flip the first character of the signature to another base64url char.
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let mut signature: Vec<char> = parts[2].chars().collect();
        signature[0] = if signature[0] == 'A' { 'B' } else { 'A' };
        parts[2] = signature.into_iter().collect();

        let result = codec.verify(&parts.join("."));
        assert!(matches!(result, Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn test_tampered_payload_never_yields_claims() {
        let codec = test_codec();
        let token = codec.issue("u1", Duration::from_secs(900)).unwrap();

        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let mut payload: Vec<char> = parts[1].chars().collect();
        payload[0] = if payload[0] == 'e' { 'f' } else { 'e' };
        parts[1] = payload.into_iter().collect();

        assert!(codec.verify(&parts.join(".")).is_err());
    }

    #[test]
    fn test_foreign_key_rejected() {
        let codec = test_codec();
        let other = TokenCodec::new(
            &SigningKey::from_secret("ffffffffffffffffffffffffffffffff").unwrap(),
            "https://resonate.example.com",
        );

        let token = other.issue("u1", Duration::from_secs(900)).unwrap();
        assert!(matches!(
            codec.verify(&token),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let codec = test_codec();
        assert!(matches!(
            codec.verify("not-a-token"),
            Err(AuthError::Malformed { .. })
        ));
        assert!(matches!(
            codec.verify(""),
            Err(AuthError::Malformed { .. })
        ));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let codec = test_codec();
        let other = TokenCodec::new(&test_key(), "https://elsewhere.example.com");

        let token = other.issue("u1", Duration::from_secs(900)).unwrap();
        assert!(matches!(
            codec.verify(&token),
            Err(AuthError::InvalidToken { .. })
        ));
    }
}
