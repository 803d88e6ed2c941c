use std::sync::Arc;

use crate::models::user::User;
use crate::oauth::store::AuthStore;

/// User credential verification for the password grant: look the user up by
/// email, then check the presented password against the stored hash.
#[derive(Clone)]
pub struct CredentialVerifier {
    store: Arc<dyn AuthStore>,
}

impl CredentialVerifier {
    pub fn new(store: Arc<dyn AuthStore>) -> Self {
        Self { store }
    }

    /// Returns the user when both lookup and password check succeed.
    ///
    /// An unknown email and a wrong password both come back as `None`; the
    /// two failures must stay indistinguishable to callers.
    pub async fn verify(&self, email: &str, password: &str) -> anyhow::Result<Option<User>> {
        let user = match self.store.find_user_by_email(email).await? {
            Some(user) => user,
            None => return Ok(None),
        };
        if user.password_matches(password) {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::NewUser;
    use crate::store::memory::MemStore;

    fn verifier_with_user() -> CredentialVerifier {
        let store = Arc::new(MemStore::default());
        store.insert_user(&NewUser {
            email: "test@example.com".to_string(),
            password_hash: bcrypt::hash("password", 4).unwrap(),
            firstname: String::new(),
            lastname: String::new(),
            scope: "email".to_string(),
        });
        CredentialVerifier::new(store)
    }

    #[tokio::test]
    async fn correct_credentials_resolve_the_user() {
        let verifier = verifier_with_user();
        let user = verifier.verify("test@example.com", "password").await.unwrap();
        assert_eq!(user.unwrap().email, "test@example.com");
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_are_indistinguishable() {
        let verifier = verifier_with_user();
        let unknown = verifier.verify("nobody@example.com", "password").await.unwrap();
        let wrong = verifier.verify("test@example.com", "wrong").await.unwrap();
        assert!(unknown.is_none());
        assert!(wrong.is_none());
    }
}
