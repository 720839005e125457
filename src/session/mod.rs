//! Session token lifecycle: issuance, cookies, revocation and request-time validation.

pub mod cookie;
pub mod lifetime;
pub mod revocation;
pub mod token;
pub mod validator;

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;

    use crate::{config::AuthConfig, models::user::User};

    pub fn test_config(lifetime: &str) -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            token_lifetime: lifetime.to_string(),
            cookie_domain: None,
        }
    }

    pub fn test_user() -> User {
        let now = Utc::now();
        User {
            id: 42,
            username: Some("alice".to_string()),
            email: "alice@example.com".to_string(),
            password: "$argon2id$stub".to_string(),
            verified: true,
            disabled: false,
            created_at: now,
            updated_at: now,
        }
    }
}
