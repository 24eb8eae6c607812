//! Domain types for authentication and delegated authorization.

pub mod delegated;
pub mod principal;
pub mod refresh_session;

pub use delegated::{DelegatedAuthorization, GrantType, SYSTEM_PRINCIPAL};
pub use principal::Principal;
pub use refresh_session::RefreshSession;
