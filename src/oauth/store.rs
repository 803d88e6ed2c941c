use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::models::client::Client;
use crate::models::token::{AccessTokenRow, RefreshTokenRow};
use crate::models::user::User;
use crate::oauth::token::generate_token;
use crate::oauth::{ACCESS_TOKEN_TTL_SECS, REFRESH_TOKEN_TTL_DAYS};

/// Fully resolved bearer grant: the live entities behind an access token.
///
/// Expiry is data here, not policy: the store returns expired grants and the
/// caller decides what to do with them.
#[derive(Debug, Clone)]
pub struct AccessGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub client: Client,
    pub user: User,
    pub scope: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl AccessGrant {
    /// Seconds until expiry at the moment of the call. Negative once expired.
    pub fn expires_in(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds()
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Freshly minted access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: AccessTokenRow,
    pub refresh: RefreshTokenRow,
}

impl TokenPair {
    /// Mint rows for (client, user, scope): fresh random token strings, both
    /// lifetimes anchored to the same creation instant. Persisting the pair
    /// is the store's job.
    pub fn mint(client: &Client, user: &User, scope: &str) -> Self {
        let now = Utc::now();
        let access = AccessTokenRow {
            token: generate_token(),
            client_id: client.id.clone(),
            user_id: user.id,
            scope: scope.to_string(),
            expires_at: now + Duration::seconds(ACCESS_TOKEN_TTL_SECS),
            created_at: now,
        };
        let refresh = RefreshTokenRow {
            token: generate_token(),
            access_token: access.token.clone(),
            client_id: client.id.clone(),
            user_id: user.id,
            scope: scope.to_string(),
            expires_at: now + Duration::days(REFRESH_TOKEN_TTL_DAYS),
            created_at: now,
        };
        TokenPair { access, refresh }
    }
}

/// Storage contract of the authorization server.
///
/// One relational implementation backs production ([`PgStore`]); an in-memory
/// one backs the test suites ([`MemStore`]). Lookups return `Ok(None)` for
/// absent rows; `Err` is reserved for backend failures.
///
/// [`PgStore`]: crate::store::postgres::PgStore
/// [`MemStore`]: crate::store::memory::MemStore
#[async_trait]
pub trait AuthStore: Send + Sync {
    /// Resolve a client id to its registration record.
    async fn resolve_client(&self, client_id: &str) -> anyhow::Result<Option<Client>>;

    /// Look up a user by email for the password grant.
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    /// Mint and persist a new token pair for (client, user).
    ///
    /// Both rows are written in one transaction: either the full pair lands
    /// or nothing does. Any live pair for the same (client, user) is
    /// superseded in that same transaction, so at most one live access token
    /// exists per pair owner.
    async fn create_token_pair(
        &self,
        client: &Client,
        user: &User,
        scope: &str,
    ) -> anyhow::Result<TokenPair>;

    /// Resolve an access token string to the full grant behind it, with the
    /// client and user entities loaded eagerly.
    async fn load_access_token(&self, token: &str) -> anyhow::Result<Option<AccessGrant>>;

    /// Resolve a refresh token to the grant of its paired access token.
    /// Defined in terms of [`load_access_token`](AuthStore::load_access_token),
    /// so the result shape is identical.
    async fn load_refresh_token(&self, token: &str) -> anyhow::Result<Option<AccessGrant>>;

    /// Delete an access token. Unknown tokens are not an error.
    async fn remove_access_token(&self, token: &str) -> anyhow::Result<()>;

    /// Delete a refresh token. Unknown tokens are not an error.
    async fn remove_refresh_token(&self, token: &str) -> anyhow::Result<()>;
}
