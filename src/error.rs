use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A database error.
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// A connection pool error.
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// A connection pool could not be built.
    #[error("Pool creation error: {0}")]
    CreatePool(#[from] deadpool_postgres::CreatePoolError),

    /// A Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A token could not be signed.
    #[error("Token signing error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// A token presented for revocation could not be decoded.
    #[error("Invalid token")]
    InvalidToken,

    /// No session cookie or bearer header was presented.
    #[error("Missing credential")]
    MissingCredential,

    /// The presented token is forged, expired or revoked.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// The token is already on the denylist.
    #[error("Token already revoked")]
    AlreadyRevoked,

    /// An authentication error.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The account exists but has been disabled.
    #[error("Account disabled")]
    AccountDisabled,

    /// A resource not found error.
    #[error("Resource not found")]
    NotFound,

    /// A uniqueness conflict.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A row was missing an expected column.
    #[error("Missing data: {0}")]
    MissingData(String),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// The HTTP status this error is surfaced as.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidToken | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::MissingCredential
            | AppError::Unauthenticated(_)
            | AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::AccountDisabled => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::AlreadyRevoked | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_)
            | AppError::Pool(_)
            | AppError::CreatePool(_)
            | AppError::Redis(_)
            | AppError::Token(_)
            | AppError::MissingData(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                "Database error".to_string()
            }

            AppError::Pool(ref e) => {
                tracing::error!("Pool error: {}", e);
                "Database error".to_string()
            }

            AppError::CreatePool(ref e) => {
                tracing::error!("Pool creation error: {}", e);
                "Database error".to_string()
            }

            AppError::Redis(ref e) => {
                tracing::error!("Redis error: {}", e);
                "Cache error".to_string()
            }

            AppError::Token(ref e) => {
                tracing::error!("Token signing error: {}", e);
                "Internal server error".to_string()
            }

            AppError::InvalidToken => {
                tracing::debug!("Invalid token presented for revocation");
                "Invalid token".to_string()
            }

            AppError::MissingCredential => {
                tracing::debug!("No credential presented");
                "Unauthorized".to_string()
            }

            AppError::Unauthenticated(ref msg) => {
                tracing::warn!("Unauthenticated: {}", msg);
                "Unauthorized".to_string()
            }

            AppError::AlreadyRevoked => {
                tracing::debug!("Token already revoked");
                "Token already revoked".to_string()
            }

            AppError::Authentication(ref msg) => {
                tracing::warn!("Authentication failed: {}", msg);
                msg.clone()
            }

            AppError::AccountDisabled => {
                tracing::warn!("Login attempt on disabled account");
                "Account disabled".to_string()
            }

            AppError::NotFound => {
                tracing::debug!("Resource not found");
                "Resource not found".to_string()
            }

            AppError::Conflict(ref msg) => {
                tracing::debug!("Conflict: {}", msg);
                msg.clone()
            }

            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                msg.clone()
            }

            AppError::MissingData(ref column) => {
                tracing::error!("Missing column in row: {}", column);
                "Internal server error".to_string()
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
        };

        let body = sonic_rs::to_string(&sonic_rs::json!({
            "error": message
        }))
        .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

        (
            self.status(),
            [(http::header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response()
    }
}
