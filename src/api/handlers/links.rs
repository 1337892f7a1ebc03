//! Handlers for link endpoints.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::dto::links::{CreateLinkBody, LinkListResponse, LinkResponse, StatsResponse};
use crate::api::dto::pagination::PaginationParams;
use crate::api::middleware::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Creates an anonymous link.
///
/// # Endpoint
///
/// `POST /api/urls`
///
/// # Request Body
///
/// ```json
/// {
///   "long_url": "https://example.com/very/long/path",
///   "short_code": "promo2025",   // optional
///   "expiry_hours": 24           // optional, default 168
/// }
/// ```
pub async fn create_anonymous_handler(
    State(state): State<AppState>,
    Json(body): Json<CreateLinkBody>,
) -> Result<(StatusCode, Json<LinkResponse>), AppError> {
    body.validate()?;

    let link = state
        .link_service
        .create_anonymous(body.long_url, body.short_code, body.expiry_hours)
        .await?;

    let short_url = state.short_url(&link.short_code);
    Ok((
        StatusCode::CREATED,
        Json(LinkResponse::from_link(link, short_url)),
    ))
}

/// Creates a permanent link owned by the caller.
///
/// `POST /v1/api/urls`
pub async fn create_link_handler(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(body): Json<CreateLinkBody>,
) -> Result<(StatusCode, Json<LinkResponse>), AppError> {
    body.validate()?;

    let link = state
        .link_service
        .create_for_user(user_id, body.long_url, body.short_code)
        .await?;

    let short_url = state.short_url(&link.short_code);
    Ok((
        StatusCode::CREATED,
        Json(LinkResponse::from_link(link, short_url)),
    ))
}

/// Lists the caller's links, newest first.
///
/// `GET /v1/api/urls?page=1&per_page=10`
///
/// `per_page` is clamped to 1..=100 and `page` to at least 1.
pub async fn list_links_handler(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<LinkListResponse>, AppError> {
    let page = state
        .link_service
        .list_links_for_user(user_id, params.into())
        .await?;

    Ok(Json(LinkListResponse::from_page(page, |code| {
        state.short_url(code)
    })))
}

/// `GET /v1/api/urls/{id}`
pub async fn get_link_handler(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<LinkResponse>, AppError> {
    let link = state.link_service.get_link(user_id, id).await?;
    let short_url = state.short_url(&link.short_code);
    Ok(Json(LinkResponse::from_link(link, short_url)))
}

/// `GET /v1/api/urls/{id}/stats`
pub async fn link_stats_handler(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<StatsResponse>, AppError> {
    let stats = state.link_service.get_stats(user_id, id).await?;
    Ok(Json(stats.into()))
}

/// Hard-deletes one of the caller's links.
///
/// `DELETE /v1/api/urls/{id}` responds `204 No Content`.
pub async fn delete_link_handler(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.link_service.delete_link(user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
