//! Cache service trait and error types.

use async_trait::async_trait;
use std::time::Duration;

/// Errors that can occur during cache operations.
///
/// Callers on the request path never surface these. They log a warning and fall
/// back to the durable store.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The backend could not be reached.
    #[error("Cache unavailable: {0}")]
    Unavailable(String),
    /// The backend answered but the command failed (wrong type, bad value).
    #[error("Cache operation failed: {0}")]
    Operation(String),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Key-value cache with per-key TTL and atomic increment.
///
/// The cache is shared by every component without any application-level locking.
/// Counter correctness rests entirely on [`CacheService::incr_by`] being atomic in the
/// backend.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisCache`] - Redis through a `ConnectionManager`
/// - [`crate::infrastructure::cache::MemoryCache`] - in-process fallback
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Returns the value stored at `key`, or `None` on a miss.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Stores `value` at `key` for `ttl`. TTLs below one second are rounded up.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Stores several entries. Backends that support it send them in one round trip.
    async fn set_many(&self, entries: &[(String, String, Duration)]) -> CacheResult<()> {
        for (key, value, ttl) in entries {
            self.set(key, value, *ttl).await?;
        }
        Ok(())
    }

    /// Atomically adds `delta` to the integer at `key` (missing keys start at 0)
    /// and returns the new value.
    async fn incr_by(&self, key: &str, delta: i64) -> CacheResult<i64>;

    /// Atomically increments the integer at `key` by one.
    async fn incr(&self, key: &str) -> CacheResult<i64> {
        self.incr_by(key, 1).await
    }

    /// Sets the TTL of an existing key. Returns `false` if the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool>;

    /// Deletes all given keys in one call. Returns how many existed.
    async fn delete(&self, keys: &[String]) -> CacheResult<u64>;

    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// Checks if the cache backend is healthy.
    async fn health_check(&self) -> bool;
}

/// Whole seconds for a backend TTL, never below one.
pub(crate) fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 {
        secs.saturating_add(1)
    } else {
        secs
    }
    .max(1)
}
