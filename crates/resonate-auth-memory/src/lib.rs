//! # resonate-auth-memory
//!
//! In-memory storage backend for `resonate-auth`.
//!
//! Suitable for tests and single-instance deployments. The refresh session
//! map implements rotation as a compare-and-swap under its write lock, so
//! the single-use guarantee holds under concurrency within the process;
//! multi-instance deployments need a backend whose storage layer provides
//! the same guarantee.

pub mod delegated;
pub mod principal;
pub mod refresh_session;

pub use delegated::InMemoryDelegatedAuthorizationStorage;
pub use principal::InMemoryPrincipalStore;
pub use refresh_session::InMemoryRefreshSessionStorage;
