use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    revocation_store: &'static str,
}

/// Reports liveness and whether the revocation store answers.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (status, store) = match state.revocations.store().ping().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            tracing::error!("❌ Revocation store health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    };

    let body = HealthResponse {
        status: if status == StatusCode::OK { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        revocation_store: store,
    };

    (status, Json(body))
}
