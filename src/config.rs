use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use anyhow::{Context, Result};

/// Default token lifetime when `JWT_EXPIRES_IN` is not set.
pub const DEFAULT_TOKEN_LIFETIME: &str = "1d";

/// Where revoked tokens are recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevocationBackend {
    /// The `revoked_tokens` table in PostgreSQL.
    Postgres,
    /// `revoked:<token>` keys in Redis, expiring with the token.
    Redis,
    /// A process-local map. Only suitable for a single instance.
    Memory,
}

impl FromStr for RevocationBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("Unknown REVOCATION_BACKEND: {}", other),
        }
    }
}

/// Settings consumed by the token issuer, the revocation service and the
/// cookie builder.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// HMAC-SHA256 signing secret.
    pub jwt_secret: String,
    /// Human-readable token lifetime, e.g. `"60m"` or `"1d"`.
    pub token_lifetime: String,
    /// Optional `Domain` attribute for the session cookie.
    pub cookie_domain: Option<String>,
}

/// The application's configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// The address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// The URL of the PostgreSQL database.
    pub database_url: String,
    /// The URL of the Redis server.
    pub redis_url: String,
    /// Which store keeps revoked tokens.
    pub revocation_backend: RevocationBackend,
    /// Token and cookie settings.
    pub auth: AuthConfig,
    /// Seconds after which one spent login attempt is given back to a client IP.
    pub login_replenish_secs: u64,
    /// Login burst allowance per client IP.
    pub login_burst: u32,
    /// How often expired revocation records are purged.
    pub revocation_purge_interval_secs: u64,
    /// Origins allowed to make credentialed cross-origin requests.
    pub cors_origins: Vec<String>,
}

fn parse_var<T>(name: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .with_context(|| format!("Invalid {}", name))
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let jwt_secret = env::var("JWT_SECRET")
            .context("JWT_SECRET must be set (generate with: openssl rand -hex 32)")?;

        if jwt_secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }

        let revocation_backend = env::var("REVOCATION_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .parse()?;

        let cookie_domain = env::var("COOKIE_DOMAIN")
            .ok()
            .filter(|d| !d.trim().is_empty());

        let login_replenish_secs: u64 = parse_var("LOGIN_REPLENISH_SECS", "6")?;
        let login_burst: u32 = parse_var("LOGIN_BURST", "10")?;
        if login_replenish_secs == 0 || login_burst == 0 {
            anyhow::bail!("LOGIN_REPLENISH_SECS and LOGIN_BURST must be positive");
        }

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        Ok(Self {
            bind_addr: parse_var("BIND_ADDR", "127.0.0.1:3000")?,
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            revocation_backend,
            auth: AuthConfig {
                jwt_secret,
                token_lifetime: env::var("JWT_EXPIRES_IN")
                    .unwrap_or_else(|_| DEFAULT_TOKEN_LIFETIME.to_string()),
                cookie_domain,
            },
            login_replenish_secs,
            login_burst,
            revocation_purge_interval_secs: parse_var("REVOCATION_PURGE_INTERVAL_SECS", "3600")?,
            cors_origins,
        })
    }
}
