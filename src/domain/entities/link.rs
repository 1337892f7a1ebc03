//! Link entity representing a shortened URL mapping.

use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

/// A shortened URL with its durable state.
///
/// `clicks` is the value persisted in the store. It lags the live total by at most
/// one batch of clicks still held in the cache counter.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id: Uuid,
    pub owner_id: Option<Uuid>,
    pub long_url: String,
    pub short_code: String,
    pub clicks: i64,
    pub is_anonymous: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Link {
    /// Returns true if `expires_at` is set and not after `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|e| now >= e)
    }

    /// Returns true if the link has passed its expiry time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == Some(user_id)
    }

    /// TTL for the cached mapping of this link.
    ///
    /// Expiring links are cached for exactly their remaining lifetime; permanent
    /// links get `default_ttl`. Returns `None` once the link has expired.
    pub fn cache_ttl(&self, default_ttl: Duration, now: DateTime<Utc>) -> Option<Duration> {
        match self.expires_at {
            None => Some(default_ttl),
            Some(expires_at) => (expires_at - now)
                .to_std()
                .ok()
                .filter(|remaining| !remaining.is_zero()),
        }
    }
}

/// Input data for persisting a new link.
#[derive(Debug, Clone)]
pub struct NewLink {
    pub id: Uuid,
    pub owner_id: Option<Uuid>,
    pub long_url: String,
    pub short_code: String,
    pub is_anonymous: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Aggregate figures over the whole link table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkSummary {
    pub total: i64,
    pub anonymous: i64,
    pub expired: i64,
    pub durable_clicks: i64,
}
