//! User registration, login, JWT authentication and password reset.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::ValidateEmail;

use crate::domain::entities::{NewUser, User};
use crate::domain::repositories::UserRepository;
use crate::error::AppError;
use crate::infrastructure::cache::{CacheService, keys};
use crate::utils::password::{
    check_password_policy, generate_reset_token, hash_password, verify_password,
};

/// Lifetime of the logout marker. Tokens older than this are expired anyway.
const SESSION_MARKER_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Lifetime of a password reset token.
const RESET_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
}

/// What a token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Bearer token for protected routes.
    Access,
    /// Only exchangeable for a new token pair.
    Refresh,
}

/// Token claims.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    /// Issue time in milliseconds, compared against the logout marker.
    pub iat_ms: i64,
    pub typ: TokenKind,
}

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct Session {
    pub tokens: TokenPair,
    pub user: User,
}

/// Service for user accounts and bearer token validation.
///
/// Tokens are stateless HS256 JWTs. Logout writes `session:<user id>` with the
/// logout time; any token issued at or before that instant is rejected while the
/// marker lives. A password reset writes the same marker.
pub struct AuthService<U: UserRepository + ?Sized> {
    users: Arc<U>,
    cache: Arc<dyn CacheService>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_ttl: ChronoDuration,
    refresh_token_ttl: ChronoDuration,
}

impl<U: UserRepository + ?Sized> AuthService<U> {
    pub fn new(users: Arc<U>, cache: Arc<dyn CacheService>, settings: &AuthSettings) -> Self {
        Self {
            users,
            cache,
            encoding_key: EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.jwt_secret.as_bytes()),
            access_token_ttl: ChronoDuration::minutes(settings.access_token_minutes),
            refresh_token_ttl: ChronoDuration::days(settings.refresh_token_days),
        }
    }

    /// Registers a new account.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidInput`] for a malformed email, empty name or weak password
    /// - [`AppError::Conflict`] if the email is already registered
    pub async fn register(&self, input: RegisterInput) -> Result<User, AppError> {
        let email = input.email.trim().to_lowercase();
        if !email.validate_email() {
            return Err(AppError::invalid_input(
                "Invalid email address",
                json!({ "field": "email" }),
            ));
        }
        let first_name = input.first_name.trim().to_string();
        let last_name = input.last_name.trim().to_string();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(AppError::invalid_input(
                "First and last name are required",
                json!({}),
            ));
        }
        check_password_policy(&input.password)?;

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(email_taken());
        }

        let password_hash = hash_blocking(input.password).await?;

        let user = self
            .users
            .create(NewUser {
                id: Uuid::new_v4(),
                email,
                password_hash,
                first_name,
                last_name,
            })
            .await
            .map_err(|e| match e {
                AppError::Conflict { .. } => email_taken(),
                other => other,
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Verifies credentials and issues an access/refresh token pair.
    ///
    /// Unknown email and wrong password produce the same error.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let email = email.trim().to_lowercase();
        let Some(user) = self.users.find_by_email(&email).await? else {
            return Err(invalid_credentials());
        };

        let password = password.to_string();
        let hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AppError::internal("Hashing task failed", json!({ "reason": e.to_string() })))??;

        if !matches {
            return Err(invalid_credentials());
        }

        let tokens = self.issue_pair(user.id)?;
        tracing::info!(user_id = %user.id, "User logged in");

        Ok(Session { tokens, user })
    }

    /// Exchanges a refresh token for a new token pair.
    ///
    /// The refresh token is subject to the same logout check as access tokens.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let user_id = self.verify(refresh_token, TokenKind::Refresh).await?;
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AppError::unauthorized(
                "Invalid or expired token",
                json!({ "reason": "unknown subject" }),
            ));
        }

        let tokens = self.issue_pair(user_id)?;
        tracing::debug!(%user_id, "Token pair refreshed");
        Ok(tokens)
    }

    /// Validates a bearer access token and returns the user id it was issued to.
    ///
    /// If the cache cannot be read, the logout check is skipped.
    pub async fn authenticate(&self, token: &str) -> Result<Uuid, AppError> {
        self.verify(token, TokenKind::Access).await
    }

    /// Invalidates every token issued to `user_id` up to now.
    pub async fn logout(&self, user_id: Uuid) -> Result<(), AppError> {
        self.revoke_tokens(user_id).await;
        tracing::info!(%user_id, "User logged out");
        Ok(())
    }

    pub async fn me(&self, user_id: Uuid) -> Result<User, AppError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found", json!({})))
    }

    /// Issues a one-hour reset token for the account registered under `email`.
    ///
    /// Returns `None` for an unknown email so callers can answer identically in
    /// both cases. Delivering the token to the user is up to the caller.
    pub async fn request_password_reset(&self, email: &str) -> Result<Option<String>, AppError> {
        let email = email.trim().to_lowercase();
        let Some(user) = self.users.find_by_email(&email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(None);
        };

        let token = generate_reset_token()?;
        let expires_at = Utc::now() + ChronoDuration::seconds(RESET_TOKEN_TTL.as_secs() as i64);
        self.users
            .set_reset_token(user.id, &token, expires_at)
            .await?;

        if let Err(e) = self
            .cache
            .set(&keys::reset_token_key(&token), &user.id.to_string(), RESET_TOKEN_TTL)
            .await
        {
            tracing::warn!(user_id = %user.id, error = %e, "Reset token not cached, store lookup only");
        }

        tracing::info!(user_id = %user.id, "Password reset token issued");
        Ok(Some(token))
    }

    /// Sets a new password using a reset token and revokes existing tokens.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidInput`] if the token is unknown or expired, or the
    ///   password is weak
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AppError> {
        check_password_policy(new_password)?;

        let Some(user) = self.find_reset_holder(token).await? else {
            return Err(AppError::invalid_input(
                "Invalid or expired reset token",
                json!({ "field": "token" }),
            ));
        };

        let password_hash = hash_blocking(new_password.to_string()).await?;
        self.users.update_password(user.id, &password_hash).await?;

        if let Err(e) = self.cache.delete(&[keys::reset_token_key(token)]).await {
            tracing::warn!(user_id = %user.id, error = %e, "Reset token left in cache until TTL");
        }
        self.revoke_tokens(user.id).await;

        tracing::info!(user_id = %user.id, "Password reset");
        Ok(())
    }

    /// Cache first, store as the source of truth.
    async fn find_reset_holder(&self, token: &str) -> Result<Option<User>, AppError> {
        let now = Utc::now();

        match self.cache.get(&keys::reset_token_key(token)).await {
            Ok(Some(raw)) => {
                if let Ok(user_id) = Uuid::parse_str(&raw)
                    && let Some(user) = self.users.find_by_id(user_id).await?
                    && user.reset_token_matches(token, now)
                {
                    return Ok(Some(user));
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Reset token cache unavailable"),
        }

        self.users.find_by_reset_token(token).await
    }

    async fn verify(&self, token: &str, expected: TokenKind) -> Result<Uuid, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                AppError::unauthorized("Invalid or expired token", json!({ "reason": e.to_string() }))
            })?
            .claims;

        if claims.typ != expected {
            return Err(AppError::unauthorized(
                "Invalid or expired token",
                json!({ "reason": "wrong token type" }),
            ));
        }

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| {
            AppError::unauthorized("Invalid or expired token", json!({ "reason": "bad subject" }))
        })?;

        match self.cache.get(&keys::session_key(&user_id)).await {
            Ok(Some(raw)) => {
                let logged_out_at = raw.parse::<i64>().unwrap_or(i64::MAX);
                if claims.iat_ms <= logged_out_at {
                    return Err(AppError::unauthorized(
                        "Session has been logged out",
                        json!({}),
                    ));
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "Logout marker unavailable, accepting token");
            }
        }

        Ok(user_id)
    }

    /// Writes the logout marker. Best effort.
    async fn revoke_tokens(&self, user_id: Uuid) {
        let now_ms = Utc::now().timestamp_millis();
        if let Err(e) = self
            .cache
            .set(
                &keys::session_key(&user_id),
                &now_ms.to_string(),
                SESSION_MARKER_TTL,
            )
            .await
        {
            tracing::warn!(%user_id, error = %e, "Failed to store logout marker");
        }
    }

    fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, AppError> {
        let now = Utc::now();
        let (access_token, access_expires_at) =
            self.issue_token(user_id, TokenKind::Access, now, self.access_token_ttl)?;
        let (refresh_token, refresh_expires_at) =
            self.issue_token(user_id, TokenKind::Refresh, now, self.refresh_token_ttl)?;

        Ok(TokenPair {
            access_token,
            access_expires_at,
            refresh_token,
            refresh_expires_at,
        })
    }

    fn issue_token(
        &self,
        user_id: Uuid,
        kind: TokenKind,
        now: DateTime<Utc>,
        ttl: ChronoDuration,
    ) -> Result<(String, DateTime<Utc>), AppError> {
        let expires_at = now + ttl;
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
            iat_ms: now.timestamp_millis(),
            typ: kind,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(
            |e| AppError::internal("Failed to issue token", json!({ "reason": e.to_string() })),
        )?;
        Ok((token, expires_at))
    }
}

async fn hash_blocking(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::internal("Hashing task failed", json!({ "reason": e.to_string() })))?
}

fn invalid_credentials() -> AppError {
    AppError::unauthorized("Invalid email or password", json!({}))
}

fn email_taken() -> AppError {
    AppError::conflict("Email is already registered", json!({ "field": "email" }))
}
