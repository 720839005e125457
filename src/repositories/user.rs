use async_trait::async_trait;
use chrono::Utc;
use deadpool_postgres::Pool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_postgres::{error::SqlState, Row};

use crate::{
    error::{AppError, Result},
    models::user::{NewUser, User},
};

/// Storage for user credentials.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts a new user. Fails with `Conflict` if the email or username is taken.
    async fn create(&self, user: NewUser) -> Result<User>;

    /// Finds a user by email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Finds a user by id.
    async fn find_by_id(&self, id: i32) -> Result<Option<User>>;
}

/// A helper function to map a `tokio_postgres::Row` to a `User`.
fn row_to_user(row: &Row) -> Result<User> {
    Ok(User {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        username: row.try_get("username").map_err(|_| AppError::MissingData("username".to_string()))?,
        email: row.try_get("email").map_err(|_| AppError::MissingData("email".to_string()))?,
        password: row.try_get("password").map_err(|_| AppError::MissingData("password".to_string()))?,
        verified: row.try_get("verified").map_err(|_| AppError::MissingData("verified".to_string()))?,
        disabled: row.try_get("disabled").map_err(|_| AppError::MissingData("disabled".to_string()))?,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
        updated_at: row.try_get("updated_at").map_err(|_| AppError::MissingData("updated_at".to_string()))?,
    })
}

/// PostgreSQL-backed user repository.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: Pool,
}

impl PgUserRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: NewUser) -> Result<User> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                r#"
                INSERT INTO users (username, email, password)
                VALUES ($1, $2, $3)
                RETURNING *
                "#,
                &[&user.username, &user.email, &user.password_hash],
            )
            .await
            .map_err(|e| match e.code() {
                Some(code) if *code == SqlState::UNIQUE_VIOLATION => {
                    AppError::Conflict("Email or username already registered".to_string())
                }
                _ => AppError::Database(e),
            })?;
        row_to_user(&row)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT *
                FROM users
                WHERE email = $1
                "#,
                &[&email],
            )
            .await?;
        row.map(|r| row_to_user(&r)).transpose()
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT *
                FROM users
                WHERE id = $1
                "#,
                &[&id],
            )
            .await?;
        row.map(|r| row_to_user(&r)).transpose()
    }
}

/// In-memory user repository, used by tests and the `memory` deployment.
#[derive(Default)]
pub struct MemoryUserRepository {
    users: Arc<RwLock<HashMap<i32, User>>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips the `disabled` flag on an existing user.
    pub async fn set_disabled(&self, id: i32, disabled: bool) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(AppError::NotFound)?;
        user.disabled = disabled;
        user.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: NewUser) -> Result<User> {
        let mut users = self.users.write().await;

        let taken = users.values().any(|u| {
            u.email == user.email
                || (user.username.is_some() && u.username == user.username)
        });
        if taken {
            return Err(AppError::Conflict(
                "Email or username already registered".to_string(),
            ));
        }

        let now = Utc::now();
        let id = users.keys().max().copied().unwrap_or(0) + 1;
        let created = User {
            id,
            username: user.username,
            email: user.email,
            password: user.password_hash,
            verified: false,
            disabled: false,
            created_at: now,
            updated_at: now,
        };
        users.insert(id, created.clone());
        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }
}
