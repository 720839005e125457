use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::{
    error::{AppError, Result},
    models::revocation::RevokedToken,
    repositories::revocation::RevocationStore,
};

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: i64,
}

/// Reads the `exp` claim of a token without checking its signature.
///
/// Only used for denylist bookkeeping; request-time validation verifies the
/// signature separately.
pub fn read_expiry(token: &str) -> Result<DateTime<Utc>> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::from(["exp".to_string()]);

    let data = decode::<ExpiryClaim>(token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(|e| {
            tracing::debug!("Token rejected for revocation: {}", e);
            AppError::InvalidToken
        })?;

    DateTime::from_timestamp(data.claims.exp, 0).ok_or(AppError::InvalidToken)
}

/// Records logged-out tokens and answers whether a token was revoked.
#[derive(Clone)]
pub struct RevocationService {
    store: Arc<dyn RevocationStore>,
}

impl RevocationService {
    pub fn new(store: Arc<dyn RevocationStore>) -> Self {
        Self { store }
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn RevocationStore> {
        &self.store
    }

    /// Adds a token to the denylist until its own expiry.
    ///
    /// Fails with `InvalidToken` if no numeric `exp` can be read, and with
    /// `AlreadyRevoked` if the token is already listed. Nothing is written
    /// on failure.
    pub async fn revoke(&self, token: &str) -> Result<RevokedToken> {
        let expires_at = read_expiry(token)?;

        let record = RevokedToken {
            token: token.to_string(),
            expires_at,
            created_at: Utc::now(),
        };
        self.store.insert(&record).await?;

        tracing::info!(%expires_at, "🚫 Token revoked");
        Ok(record)
    }

    pub async fn is_revoked(&self, token: &str) -> Result<bool> {
        self.store.is_revoked(token).await
    }

    /// Drops records for tokens that have expired on their own.
    pub async fn purge_expired(&self) -> Result<u64> {
        self.store.purge_expired(Utc::now()).await
    }
}

/// Spawns the periodic purge of dead revocation records.
pub fn spawn_purge_task(service: RevocationService, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            tracing::info!("🧹 Purging expired revocation records...");
            match service.purge_expired().await {
                Ok(count) => {
                    tracing::info!("✅ Revocation purge removed {} records", count);
                }
                Err(e) => {
                    tracing::error!("❌ Revocation purge failed: {}", e);
                }
            }
        }
    })
}
