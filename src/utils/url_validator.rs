//! Long URL validation.

use crate::error::AppError;
use serde_json::json;
use url::Url;

/// Checks that `long_url` is a non-empty absolute HTTP(S) URL.
///
/// The URL is stored exactly as given; parsing is only used for validation so
/// that resolution returns the caller's original string.
pub fn validate_long_url(long_url: &str) -> Result<(), AppError> {
    let trimmed = long_url.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("long_url is required", json!({})));
    }

    let parsed = Url::parse(trimmed).map_err(|e| {
        AppError::invalid_input("Invalid URL format", json!({ "reason": e.to_string() }))
    })?;

    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(()),
        "http" | "https" => Err(AppError::invalid_input(
            "URL must include a host",
            json!({}),
        )),
        scheme => Err(AppError::invalid_input(
            "Only HTTP and HTTPS URLs are allowed",
            json!({ "scheme": scheme }),
        )),
    }
}
