use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Resource owner. The `scope` column is the default scope granted when this
/// user authenticates without requesting one explicitly.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub firstname: String,
    pub lastname: String,
    pub scope: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Check a presented password against the stored bcrypt hash.
    pub fn password_matches(&self, password: &str) -> bool {
        bcrypt::verify(password, &self.password_hash).unwrap_or(false)
    }
}

/// Input for user creation.
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub firstname: String,
    pub lastname: String,
    pub scope: String,
}
