//! API route groups.
//!
//! Paths here are relative; [`crate::routes::app_router`] nests them and applies
//! authentication and rate limiting.

use crate::api::handlers::{
    create_anonymous_handler, create_link_handler, delete_link_handler, forgot_password_handler,
    get_link_handler, link_stats_handler, list_links_handler, login_handler, logout_handler,
    me_handler, refresh_handler, register_handler, reset_password_handler,
};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

/// Anonymous link creation, nested under `/api`.
///
/// - `POST /urls` - create an expiring link without an account
pub fn public_routes() -> Router<AppState> {
    Router::new().route("/urls", post(create_anonymous_handler))
}

/// Credential endpoints, nested under `/v1/auth`.
///
/// - `POST /register`
/// - `POST /login`           - access and refresh tokens
/// - `POST /refresh`         - new token pair for a refresh token
/// - `POST /forgot-password` - issue a one-hour reset token
/// - `POST /reset-password`  - set a new password with that token
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .route("/refresh", post(refresh_handler))
        .route("/forgot-password", post(forgot_password_handler))
        .route("/reset-password", post(reset_password_handler))
}

/// Bearer-protected endpoints, nested under `/v1/api`.
///
/// - `GET    /user/me`
/// - `POST   /user/logout`
/// - `POST   /urls`            - create a permanent link
/// - `GET    /urls`            - list own links (`?page=&per_page=`)
/// - `GET    /urls/{id}`       - one link with live click count
/// - `GET    /urls/{id}/stats` - click statistics
/// - `DELETE /urls/{id}`       - hard delete
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/user/me", get(me_handler))
        .route("/user/logout", post(logout_handler))
        .route("/urls", post(create_link_handler).get(list_links_handler))
        .route("/urls/{id}", get(get_link_handler).delete(delete_link_handler))
        .route("/urls/{id}/stats", get(link_stats_handler))
}
