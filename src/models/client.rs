use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registered OAuth2 client application. Created out of band (CLI);
/// read-only to the grant machinery.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Client {
    pub id: String,
    #[serde(skip_serializing, default)]
    pub secret_hash: String,
    pub redirect_uri: String,
    pub extra: String,
    pub created_at: DateTime<Utc>,
}

impl Client {
    /// Check a presented secret against the stored bcrypt hash.
    /// An unparseable hash counts as a mismatch.
    pub fn secret_matches(&self, secret: &str) -> bool {
        bcrypt::verify(secret, &self.secret_hash).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with_secret(secret: &str) -> Client {
        Client {
            id: "1".to_string(),
            secret_hash: bcrypt::hash(secret, 4).unwrap(),
            redirect_uri: "http://localhost/callback".to_string(),
            extra: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn matching_secret_verifies() {
        let client = client_with_secret("secret");
        assert!(client.secret_matches("secret"));
    }

    #[test]
    fn wrong_secret_rejected() {
        let client = client_with_secret("secret");
        assert!(!client.secret_matches("not-the-secret"));
    }

    #[test]
    fn garbage_hash_rejected() {
        let mut client = client_with_secret("secret");
        client.secret_hash = "not-a-bcrypt-hash".to_string();
        assert!(!client.secret_matches("secret"));
    }

    #[test]
    fn secret_hash_never_serializes() {
        let client = client_with_secret("secret");
        let json = serde_json::to_value(&client).unwrap();
        assert!(json.get("secret_hash").is_none());
        assert_eq!(json["id"], "1");
    }
}
