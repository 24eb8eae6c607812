//! Refresh session domain type.
//!
//! A refresh session is the server-persisted half of a long-lived login.
//! The token handed to the client is a signed JWT whose subject is the
//! session id; only a SHA-256 hash of that string is stored, never the
//! plaintext. Rotation replaces the stored hash in place, so exactly one
//! currently-valid token string exists per session id at any time.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Refresh session stored in the database, one row per active login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSession {
    /// Server-random session identifier; the subject of the issued token.
    pub id: Uuid,

    /// SHA-256 hash of the currently-valid signed token string.
    pub token_hash: String,

    /// Public id of the owning principal.
    pub principal_public_id: String,

    /// When the session was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the currently-valid token string expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl RefreshSession {
    /// Returns `true` if the session's current token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }

    /// Hash a token string with SHA-256 for storage and lookup comparison.
    #[must_use]
    pub fn hash_token(token: &str) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }
}
