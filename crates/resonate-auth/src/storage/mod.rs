//! Storage traits for authentication data.
//!
//! This module defines the storage interfaces for:
//!
//! - Principal lookups (read-only seam to the external user store)
//! - Refresh sessions
//! - Delegated third-party authorizations
//!
//! # Implementations
//!
//! Storage implementations are provided in separate crates:
//!
//! - `resonate-auth-memory` - In-memory storage backend

pub mod delegated;
pub mod principal;
pub mod refresh_session;

pub use delegated::DelegatedAuthorizationStorage;
pub use principal::PrincipalStore;
pub use refresh_session::RefreshSessionStorage;
