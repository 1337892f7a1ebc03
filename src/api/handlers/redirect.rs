//! Handler for short URL redirect.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect},
};

use crate::error::AppError;
use crate::state::AppState;

/// Redirects a short code to its original URL.
///
/// # Endpoint
///
/// `GET /urls/{code}`
///
/// Responds `301 Moved Permanently`. Every failure, including a store outage, is
/// reported as a plain 404 so the response never reveals why a code did not
/// resolve.
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    match state.redirect_service.resolve(&code).await {
        Ok(resolution) => Ok(Redirect::permanent(&resolution.long_url)),
        Err(e) => {
            if e.status_code().is_server_error() {
                tracing::error!(code, error = %e, "Resolution failed");
            }
            Err(AppError::link_not_found())
        }
    }
}
