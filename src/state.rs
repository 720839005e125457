use redis::aio::ConnectionManager;
use std::sync::Arc;
use crate::config::{Config, RevocationBackend};
use crate::error::Result;
use crate::repositories::revocation::{
    MemoryRevocationStore, PgRevocationStore, RedisRevocationStore, RevocationStore,
};
use crate::repositories::user::{MemoryUserRepository, PgUserRepository, UserRepository};
use crate::session::{
    revocation::RevocationService, token::TokenIssuer, validator::SessionValidator,
};

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Arc<Config>,
    /// The credential store.
    pub users: Arc<dyn UserRepository>,
    /// Signs and verifies session tokens.
    pub tokens: TokenIssuer,
    /// Records logged-out tokens.
    pub revocations: RevocationService,
    /// Checks a presented token on every authenticated request.
    pub validator: SessionValidator,
}

impl AppState {
    /// Creates a new `AppState` backed by PostgreSQL and, when configured, Redis.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = crate::db::create_pool(&config.database_url)?;
        crate::db::ensure_schema(&db).await?;
        tracing::info!("✅ PostgreSQL Pool initialized with deadpool-postgres");

        let revocation_store: Arc<dyn RevocationStore> = match config.revocation_backend {
            RevocationBackend::Postgres => Arc::new(PgRevocationStore::new(db.clone())),
            RevocationBackend::Redis => {
                let redis_client = redis::Client::open(config.redis_url.as_str())?;
                let redis = ConnectionManager::new(redis_client).await?;
                tracing::info!("✅ Redis Connection Manager initialized");
                Arc::new(RedisRevocationStore::new(redis))
            }
            RevocationBackend::Memory => {
                tracing::warn!("⚠️ Revocations are kept in process memory and lost on restart");
                Arc::new(MemoryRevocationStore::new())
            }
        };
        tracing::info!("✅ Revocation store: {:?}", config.revocation_backend);

        Ok(Self::from_parts(
            config,
            Arc::new(PgUserRepository::new(db)),
            revocation_store,
        ))
    }

    /// Creates an `AppState` that keeps users and revocations in memory.
    pub fn in_memory(config: &Config) -> Self {
        Self::from_parts(
            config,
            Arc::new(MemoryUserRepository::new()),
            Arc::new(MemoryRevocationStore::new()),
        )
    }

    /// Wires the session components around the given stores.
    pub fn from_parts(
        config: &Config,
        users: Arc<dyn UserRepository>,
        revocation_store: Arc<dyn RevocationStore>,
    ) -> Self {
        let tokens = TokenIssuer::new(&config.auth);
        let revocations = RevocationService::new(revocation_store);
        let validator = SessionValidator::new(tokens.clone(), revocations.clone());

        AppState {
            config: Arc::new(config.clone()),
            users,
            tokens,
            revocations,
            validator,
        }
    }
}
