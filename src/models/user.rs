use chrono::{DateTime, Utc};
use serde::Serialize;

/// Represents a user in the system.
#[derive(Clone, Debug)]
pub struct User {
    /// The unique identifier for the user.
    pub id: i32,
    /// The user's username, if one was chosen.
    pub username: Option<String>,
    /// The user's email address.
    pub email: String,
    /// The user's Argon2id password hash.
    pub password: String,
    /// Whether the user's email address has been verified.
    pub verified: bool,
    /// Whether the account has been disabled.
    pub disabled: bool,
    /// The timestamp when the user was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Fields required to insert a new user.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: Option<String>,
    pub email: String,
    pub password_hash: String,
}

/// The public shape of a user returned by the API.
#[derive(Clone, Debug, Serialize)]
pub struct UserProfile {
    pub id: i32,
    pub username: Option<String>,
    pub email: String,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            verified: user.verified,
            created_at: user.created_at,
        }
    }
}
