//! Principal domain type.
//!
//! Principals are owned and mutated by the external user store; this crate
//! only reads them through [`crate::storage::PrincipalStore`] and never
//! persists them.

use serde::{Deserialize, Serialize};

/// An authenticated user as seen by the auth subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    /// Stable public identifier (token subject).
    pub public_id: String,

    /// Login name.
    pub username: String,

    /// Role names granted to the user.
    pub roles: Vec<String>,

    /// Disabled principals authenticate as anonymous.
    pub enabled: bool,
}

impl Principal {
    /// Creates an enabled principal with no roles.
    #[must_use]
    pub fn new(public_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            public_id: public_id.into(),
            username: username.into(),
            roles: Vec::new(),
            enabled: true,
        }
    }

    /// Adds a role.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Returns `true` if the principal carries the role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}
