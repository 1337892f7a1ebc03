//! Handlers for registration, login, password reset and session endpoints.

use axum::{Extension, Json, extract::State, http::StatusCode};
use validator::Validate;

use crate::api::dto::auth::{
    ForgotPasswordRequest, LoginRequest, MessageResponse, RefreshRequest, RegisterRequest,
    ResetPasswordRequest, TokenResponse, UserResponse,
};
use crate::api::middleware::auth::AuthUser;
use crate::application::services::auth_service::RegisterInput;
use crate::error::AppError;
use crate::state::AppState;

/// `POST /v1/auth/register`
pub async fn register_handler(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    body.validate()?;

    let user = state
        .auth_service
        .register(RegisterInput {
            email: body.email,
            password: body.password,
            first_name: body.first_name,
            last_name: body.last_name,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// `POST /v1/auth/login`
pub async fn login_handler(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    body.validate()?;

    let session = state
        .auth_service
        .login(&body.email, &body.password)
        .await?;

    Ok(Json(TokenResponse::new(session.tokens, Some(session.user))))
}

/// `POST /v1/auth/refresh`
pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    body.validate()?;

    let tokens = state.auth_service.refresh(&body.refresh_token).await?;
    Ok(Json(TokenResponse::new(tokens, None)))
}

/// `POST /v1/auth/forgot-password`
///
/// Answers the same way whether or not the email is registered. The token
/// itself is never part of the response.
pub async fn forgot_password_handler(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    body.validate()?;

    state.auth_service.request_password_reset(&body.email).await?;
    Ok(Json(MessageResponse {
        message: "If the email exists, a password reset link has been sent",
    }))
}

/// `POST /v1/auth/reset-password`
pub async fn reset_password_handler(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    body.validate()?;

    state
        .auth_service
        .reset_password(&body.token, &body.new_password)
        .await?;
    Ok(Json(MessageResponse {
        message: "Password has been reset",
    }))
}

/// `GET /v1/api/user/me`
pub async fn me_handler(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.auth_service.me(user_id).await?;
    Ok(Json(user.into()))
}

/// `POST /v1/api/user/logout`
///
/// Every token issued to the caller so far stops working.
pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<StatusCode, AppError> {
    state.auth_service.logout(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
