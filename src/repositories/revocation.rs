use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use redis::{aio::ConnectionManager, AsyncCommands};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{
    error::{AppError, Result},
    models::revocation::RevokedToken,
};

/// The denylist of tokens that were logged out before they expired.
///
/// Implementations must make a completed `insert` visible to every later
/// `is_revoked` call, and must let exactly one of two concurrent inserts of
/// the same token succeed.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Records a revoked token. Fails with `AlreadyRevoked` if it is already present.
    async fn insert(&self, record: &RevokedToken) -> Result<()>;

    /// Returns `true` if the exact token string has been revoked.
    async fn is_revoked(&self, token: &str) -> Result<bool>;

    /// Deletes records whose `expires_at` is at or before `now`.
    ///
    /// Returns the number of records removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64>;

    /// Checks that the backing store is reachable.
    async fn ping(&self) -> Result<()>;
}

/// Revocations kept in the `revoked_tokens` table.
#[derive(Clone)]
pub struct PgRevocationStore {
    pool: Pool,
}

impl PgRevocationStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevocationStore for PgRevocationStore {
    async fn insert(&self, record: &RevokedToken) -> Result<()> {
        let client = self.pool.get().await?;
        let inserted = client
            .execute(
                r#"
                INSERT INTO revoked_tokens (token, expires_at, created_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (token) DO NOTHING
                "#,
                &[&record.token, &record.expires_at, &record.created_at],
            )
            .await?;

        if inserted == 0 {
            return Err(AppError::AlreadyRevoked);
        }
        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> Result<bool> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT 1 FROM revoked_tokens WHERE token = $1",
                &[&token],
            )
            .await?;
        Ok(row.is_some())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute(
                "DELETE FROM revoked_tokens WHERE expires_at <= $1",
                &[&now],
            )
            .await?;
        Ok(deleted)
    }

    async fn ping(&self) -> Result<()> {
        let client = self.pool.get().await?;
        client.simple_query("SELECT 1").await?;
        Ok(())
    }
}

/// Revocations kept as `revoked:<token>` keys that expire with the token.
#[derive(Clone)]
pub struct RedisRevocationStore {
    redis: ConnectionManager,
}

impl RedisRevocationStore {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    fn key(token: &str) -> String {
        format!("revoked:{}", token)
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn insert(&self, record: &RevokedToken) -> Result<()> {
        let reply: Option<String> = redis::cmd("SET")
            .arg(Self::key(&record.token))
            .arg(record.created_at.timestamp())
            .arg("NX")
            .arg("EXAT")
            .arg(record.expires_at.timestamp().max(1))
            .query_async(&mut self.redis.clone())
            .await?;

        match reply {
            Some(_) => Ok(()),
            None => Err(AppError::AlreadyRevoked),
        }
    }

    async fn is_revoked(&self, token: &str) -> Result<bool> {
        let exists: bool = self.redis.clone().exists(Self::key(token)).await?;
        Ok(exists)
    }

    async fn purge_expired(&self, _now: DateTime<Utc>) -> Result<u64> {
        // Keys carry EXAT, Redis drops them on its own.
        Ok(0)
    }

    async fn ping(&self) -> Result<()> {
        let _: String = redis::cmd("PING")
            .query_async(&mut self.redis.clone())
            .await?;
        Ok(())
    }
}

/// Process-local revocations.
#[derive(Default)]
pub struct MemoryRevocationStore {
    records: Arc<RwLock<HashMap<String, RevokedToken>>>,
}

impl MemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held, expired or not.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn insert(&self, record: &RevokedToken) -> Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.token) {
            return Err(AppError::AlreadyRevoked);
        }
        records.insert(record.token.clone(), record.clone());
        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> Result<bool> {
        Ok(self.records.read().await.contains_key(token))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| !record.is_expired(now));
        Ok((before - records.len()) as u64)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(token: &str, expires_in: Duration) -> RevokedToken {
        let now = Utc::now();
        RevokedToken {
            token: token.to_string(),
            expires_at: now + expires_in,
            created_at: now,
        }
    }

    #[tokio::test]
    async fn memory_store_rejects_second_insert() {
        let store = MemoryRevocationStore::new();
        store.insert(&record("a.b.c", Duration::hours(1))).await.unwrap();

        let again = store.insert(&record("a.b.c", Duration::hours(1))).await;
        assert!(matches!(again, Err(AppError::AlreadyRevoked)));
        assert!(store.is_revoked("a.b.c").await.unwrap());
        assert!(!store.is_revoked("a.b.d").await.unwrap());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn memory_store_purges_only_dead_records() {
        let store = MemoryRevocationStore::new();
        store.insert(&record("expired", Duration::seconds(-10))).await.unwrap();
        store.insert(&record("live", Duration::hours(1))).await.unwrap();

        let purged = store.purge_expired(Utc::now()).await.unwrap();

        assert_eq!(purged, 1);
        assert!(!store.is_revoked("expired").await.unwrap());
        assert!(store.is_revoked("live").await.unwrap());
    }
}
