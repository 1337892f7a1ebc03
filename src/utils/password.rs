//! Argon2id password hashing and the account password policy.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::Engine as _;
use serde_json::json;

use crate::error::AppError;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Random bytes behind a password reset token.
const RESET_TOKEN_BYTES: usize = 32;

/// Generates an unguessable URL-safe password reset token.
pub fn generate_reset_token() -> Result<String, AppError> {
    let mut buffer = [0u8; RESET_TOKEN_BYTES];
    getrandom::fill(&mut buffer).map_err(|e| {
        AppError::internal(
            "Random source unavailable",
            json!({ "reason": e.to_string() }),
        )
    })?;

    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buffer))
}

/// Hashes `password` into a PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::internal("Password hashing failed", json!({ "reason": e.to_string() })))
}

/// Returns whether `password` matches the stored PHC `hash`.
///
/// A malformed stored hash is an internal error, not a mismatch.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        AppError::internal("Stored password hash is invalid", json!({ "reason": e.to_string() }))
    })?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Enforces the password policy: at least 8 characters with an upper-case letter,
/// a lower-case letter, a digit and a special character.
pub fn check_password_policy(password: &str) -> Result<(), AppError> {
    let mut missing = Vec::new();

    if password.chars().count() < MIN_PASSWORD_LEN {
        missing.push("min_length");
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        missing.push("uppercase");
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        missing.push("lowercase");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        missing.push("digit");
    }
    if !password.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace()) {
        missing.push("special");
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::invalid_input(
            "Password does not meet the policy",
            json!({ "missing": missing }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("Secr3t!pass").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("Secr3t!pass", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn test_hash_is_salted() {
        let a = hash_password("Secr3t!pass").unwrap();
        let b = hash_password("Secr3t!pass").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        assert!(verify_password("x", "not-a-hash").is_err());
    }

    #[test]
    fn test_reset_tokens_are_long_and_distinct() {
        let a = generate_reset_token().unwrap();
        let b = generate_reset_token().unwrap();
        assert_eq!(a.len(), 43);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_password_policy() {
        assert!(check_password_policy("Secr3t!pass").is_ok());

        let err = check_password_policy("short").unwrap_err();
        let info = err.to_error_info();
        let missing = info.details["missing"].as_array().unwrap();
        assert!(missing.iter().any(|m| m == "min_length"));
        assert!(missing.iter().any(|m| m == "digit"));

        assert!(check_password_policy("alllowercase1!").is_err());
        assert!(check_password_policy("NoDigitsHere!").is_err());
        assert!(check_password_policy("NoSpecial123").is_err());
    }
}
