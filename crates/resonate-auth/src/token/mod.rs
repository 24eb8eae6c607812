//! Local token issuance, verification and refresh rotation.

pub mod access;
pub mod codec;
pub mod refresh;

pub use access::AccessTokenIssuer;
pub use codec::{Claims, SigningKey, TokenCodec};
pub use refresh::{IssuedRefreshToken, RefreshTokenManager, RefreshedTokens};
