//! Short code generation and validation.

use crate::error::AppError;
use base64::Engine as _;
use regex::Regex;
use serde_json::json;
use std::sync::LazyLock;

/// Length of a generated short code.
pub const GENERATED_CODE_LEN: usize = 6;

/// Random bytes drawn per code. 6 bytes encode to 8 base64 characters, which are
/// then truncated to [`GENERATED_CODE_LEN`].
const CODE_ENTROPY_BYTES: usize = 6;

pub const MIN_CUSTOM_CODE_LEN: usize = 6;
pub const MAX_CUSTOM_CODE_LEN: usize = 20;

static CUSTOM_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("static regex"));

/// Generates a random 6-character code over the URL-safe base64 alphabet.
///
/// # Errors
///
/// Returns [`AppError::Internal`] if the OS random source fails.
pub fn generate_code() -> Result<String, AppError> {
    let mut buffer = [0u8; CODE_ENTROPY_BYTES];

    getrandom::fill(&mut buffer).map_err(|e| {
        AppError::internal(
            "Random source unavailable",
            json!({ "reason": e.to_string() }),
        )
    })?;

    let mut code = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buffer);
    code.truncate(GENERATED_CODE_LEN);
    Ok(code)
}

/// Validates a user-provided custom code and returns its lower-cased form.
///
/// # Rules
///
/// - Length: 6-20 characters
/// - Allowed characters: ASCII letters, digits, `-` and `_`
///
/// # Errors
///
/// Returns [`AppError::InvalidInput`] if a rule is violated.
pub fn validate_custom_code(code: &str) -> Result<String, AppError> {
    let len = code.chars().count();
    if !(MIN_CUSTOM_CODE_LEN..=MAX_CUSTOM_CODE_LEN).contains(&len) {
        return Err(AppError::invalid_input(
            "Short code must be 6-20 characters",
            json!({ "provided_length": len }),
        ));
    }

    if !CUSTOM_CODE_RE.is_match(code) {
        return Err(AppError::invalid_input(
            "Short code can only contain letters, digits, hyphens and underscores",
            json!({ "short_code": code }),
        ));
    }

    Ok(code.to_ascii_lowercase())
}
