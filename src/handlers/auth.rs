use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use crate::{
    error::{AppError, Result},
    models::user::UserProfile,
    services::auth as auth_service,
    session::{
        cookie::clearing_cookie,
        validator::{AuthUser, PresentedToken},
    },
    state::AppState,
    validation::auth::{validate_payload, validate_username},
};

/// The request payload for user registration.
#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[garde(skip)]
    pub username: Option<String>,
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 8, max = 128))]
    pub password: String,
}

/// The request payload for user login.
#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 1, max = 128))]
    pub password: String,
}

/// The response payload for registration and profile requests.
#[derive(Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: UserProfile,
}

/// The response payload for a successful login.
#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: UserProfile,
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// The response payload for logout.
#[derive(Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
}

/// Handles user registration.
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response> {
    tracing::info!("📝 Register attempt: {}", payload.email);
    validate_payload(&payload)?;
    validate_username(payload.username.as_deref())?;

    let user = auth_service::register_user(
        state.users.as_ref(),
        payload.username,
        payload.email.trim().to_lowercase(),
        &payload.password,
    )
    .await?;

    tracing::info!("✅ User registered: {}", user.id);

    let response = ProfileResponse {
        success: true,
        user: UserProfile::from(&user),
    };

    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// Handles user login.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> Result<Response> {
    tracing::info!("🔐 Login attempt: {}", payload.email);
    validate_payload(&payload)?;

    let user = auth_service::authenticate_user(
        state.users.as_ref(),
        &payload.email.trim().to_lowercase(),
        &payload.password,
    )
    .await?;

    let issued = state.tokens.issue(&user)?;
    cookies.add(issued.cookie);
    tracing::info!("✅ Session cookie added for user: {}", user.id);

    let response = LoginResponse {
        success: true,
        user: UserProfile::from(&user),
        access_token: issued.token,
        expires_at: issued.expires_at,
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Handles user logout.
///
/// The token is revoked before the cookie is cleared; if revocation fails the
/// cookie is left untouched. A token that is already revoked counts as logged out.
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(PresentedToken(token)): Extension<PresentedToken>,
    cookies: Cookies,
) -> Result<Response> {
    tracing::info!("👋 Logout for user: {}", user.user_id);

    match state.revocations.revoke(&token).await {
        Ok(_) => {}
        Err(AppError::AlreadyRevoked) => {
            tracing::debug!("Token for user {} was already revoked", user.user_id);
        }
        Err(e) => return Err(e),
    }

    cookies.add(clearing_cookie(state.tokens.cookie_domain()));

    tracing::info!("✅ User logged out: {}", user.user_id);

    let response = AuthResponse {
        success: true,
        message: "Logout successful".to_string(),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Returns the profile of the authenticated user.
#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response> {
    let record = state
        .users
        .find_by_id(user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let response = ProfileResponse {
        success: true,
        user: UserProfile::from(&record),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}
