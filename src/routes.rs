//! The route table and the router built from it.
//!
//! Each route declares its authentication requirement as data. The router
//! groups routes by that requirement and puts the single gate,
//! [`require_auth`], in front of every authenticated group.

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{MethodRouter, get, post},
};
use http::{HeaderValue, Method, header};
use std::sync::Arc;
use std::time::Duration;
use tower_cookies::CookieManagerLayer;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{
    error::{AppError, Result},
    handlers,
    middleware_layer::auth::require_auth,
    state::AppState,
};

/// What a caller must present to reach a route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    /// Open to anyone.
    Public,
    /// Open to anyone, throttled per client IP.
    RateLimited,
    /// Requires a valid, unrevoked session token.
    Authenticated,
}

/// One entry of the route table.
pub struct RouteSpec {
    pub path: &'static str,
    pub access: Access,
    pub handler: fn() -> MethodRouter<AppState>,
}

fn register_route() -> MethodRouter<AppState> {
    post(handlers::auth::register)
}

fn login_route() -> MethodRouter<AppState> {
    post(handlers::auth::login)
}

fn logout_route() -> MethodRouter<AppState> {
    post(handlers::auth::logout)
}

fn me_route() -> MethodRouter<AppState> {
    get(handlers::auth::me)
}

fn health_route() -> MethodRouter<AppState> {
    get(handlers::health::health_check)
}

pub const ROUTE_TABLE: &[RouteSpec] = &[
    RouteSpec { path: "/health", access: Access::Public, handler: health_route },
    RouteSpec { path: "/api/auth/register", access: Access::Public, handler: register_route },
    RouteSpec { path: "/api/auth/login", access: Access::RateLimited, handler: login_route },
    RouteSpec { path: "/api/auth/logout", access: Access::Authenticated, handler: logout_route },
    RouteSpec { path: "/api/auth/me", access: Access::Authenticated, handler: me_route },
];

/// Looks up the declared access requirement of a path.
pub fn access_for(path: &str) -> Option<Access> {
    ROUTE_TABLE
        .iter()
        .find(|spec| spec.path == path)
        .map(|spec| spec.access)
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>()
                .map_err(|e| AppError::Internal(format!("Invalid CORS origin {}: {}", o, e)))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::COOKIE,
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(86400)))
}

/// Builds the application router from [`ROUTE_TABLE`].
///
/// The login throttle keys on the peer address, so the router must be served
/// with `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn router(state: AppState) -> Result<Router> {
    let login_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(state.config.login_replenish_secs)
            .burst_size(state.config.login_burst)
            .use_headers()
            .finish()
            .ok_or_else(|| AppError::Internal("Invalid login rate limit settings".to_string()))?,
    );

    let mut public_routes = Router::new();
    let mut limited_routes = Router::new();
    let mut protected_routes = Router::new();

    for spec in ROUTE_TABLE {
        let method_router = (spec.handler)();
        match spec.access {
            Access::Public => public_routes = public_routes.route(spec.path, method_router),
            Access::RateLimited => limited_routes = limited_routes.route(spec.path, method_router),
            Access::Authenticated => {
                protected_routes = protected_routes.route(spec.path, method_router)
            }
        }
    }

    let limited_routes = limited_routes.layer(GovernorLayer::new(login_governor_conf));
    let protected_routes =
        protected_routes.route_layer(from_fn_with_state(state.clone(), require_auth));

    let app = Router::new()
        .merge(public_routes)
        .merge(limited_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default())
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(CookieManagerLayer::new())
        .layer(cors_layer(&state.config.cors_origins)?)
        .with_state(state);

    Ok(app)
}
