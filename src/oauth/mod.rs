//! OAuth2 authorization server core: password + refresh_token grants,
//! token-pair storage contract, and bearer introspection support types.

pub mod grant;
pub mod store;
pub mod token;
pub mod verify;

/// Lifetime of an issued access token, in seconds.
pub const ACCESS_TOKEN_TTL_SECS: i64 = 3600;

/// Lifetime of an issued refresh token, in days.
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 31;
