//! Top-level router.
//!
//! # Route Structure
//!
//! - `GET  /urls/{code}` - Short link redirect (public, not rate limited)
//! - `GET  /health`      - Health check: database, cache, background queue
//! - `/api/*`            - Anonymous link creation (rate limited)
//! - `/v1/auth/*`        - Registration, login, token refresh, password reset (strict rate limit)
//! - `/v1/api/*`         - Account and link management (Bearer token, strict rate limit)
//!
//! Trailing slashes are trimmed before routing. CORS applies to every route.

use crate::api;
use crate::api::handlers::{health_handler, redirect_handler};
use crate::api::middleware::{auth, cors, rate_limit, tracing};
use crate::state::AppState;
use axum::routing::get;
use axum::{Router, middleware};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Constructs the application router with all routes and middleware.
pub fn app_router(state: AppState, cors_origins: &[String]) -> NormalizePath<Router> {
    let public = api::routes::public_routes().layer(rate_limit::layer());

    let credentials = api::routes::auth_routes().layer(rate_limit::secure_layer());

    let protected = api::routes::protected_routes()
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::layer))
        .layer(rate_limit::secure_layer());

    let router = Router::new()
        .route("/urls/{code}", get(redirect_handler))
        .route("/health", get(health_handler))
        .nest("/api", public)
        .nest("/v1/auth", credentials)
        .nest("/v1/api", protected)
        .with_state(state)
        .layer(cors::layer(cors_origins))
        .layer(tracing::layer());

    NormalizePathLayer::trim_trailing_slash().layer(router)
}
