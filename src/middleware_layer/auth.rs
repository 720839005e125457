use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;

use crate::{
    error::AppError,
    session::{
        cookie::AUTH_COOKIE,
        validator::{select_credential, PresentedToken},
    },
    state::AppState,
};

/// Extracts the session token from the `Authentication` cookie or a bearer header.
///
/// # Arguments
///
/// * `cookies` - The request cookies.
/// * `request` - The incoming request.
///
/// # Returns
///
/// An `Option` containing the raw token if one was presented.
fn extract_session_token(cookies: &Cookies, request: &Request<Body>) -> Option<String> {
    let cookie_value = cookies.get(AUTH_COOKIE).map(|c| c.value().to_string());
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    select_credential(cookie_value.as_deref(), authorization)
}

/// The single gate for every route the route table marks as authenticated.
///
/// On success the request carries the caller's `AuthUser` and the
/// `PresentedToken` as extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    tracing::debug!("🔐 Checking authentication...");

    let token = extract_session_token(&cookies, &request);
    let user = state.validator.validate(token.as_deref()).await?;

    tracing::debug!("✅ User authenticated: {}", user.user_id);

    request.extensions_mut().insert(user);
    if let Some(token) = token {
        request.extensions_mut().insert(PresentedToken(token));
    }

    Ok(next.run(request).await)
}
