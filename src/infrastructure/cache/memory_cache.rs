//! In-process cache used when Redis is not configured, and in tests.

use super::service::{CacheError, CacheResult, CacheService, ttl_secs};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Expired entries are swept from the map once every this many writes.
const SWEEP_EVERY: u64 = 1024;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// `DashMap`-backed cache with Redis-like TTL and increment semantics.
///
/// `incr_by` runs under the shard lock of its key, which gives the same atomicity as
/// Redis `INCR`. Entries are not shared between processes.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, Entry>,
    writes: AtomicU64,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every entry, like a cache restart.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Remaining lifetime of `key`, `None` if it is missing or has no TTL.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|e| e.is_live(now))
            .and_then(|e| e.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn note_write(&self) {
        if self.writes.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            let now = Instant::now();
            self.entries.retain(|_, e| e.is_live(now));
        }
    }

    fn expiry(ttl: Duration) -> Option<Instant> {
        Instant::now().checked_add(Duration::from_secs(ttl_secs(ttl)))
    }
}

#[async_trait]
impl CacheService for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();
        if let Some(e) = self.entries.get(key)
            && e.is_live(now)
        {
            return Ok(Some(e.value.clone()));
        }
        self.entries.remove_if(key, |_, e| !e.is_live(now));
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Self::expiry(ttl),
            },
        );
        self.note_write();
        Ok(())
    }

    async fn incr_by(&self, key: &str, delta: i64) -> CacheResult<i64> {
        let now = Instant::now();
        let next = match self.entries.entry(key.to_string()) {
            MapEntry::Occupied(mut slot) if slot.get().is_live(now) => {
                let current: i64 = slot.get().value.parse().map_err(|_| {
                    CacheError::Operation(format!("value at {key} is not an integer"))
                })?;
                let next = current
                    .checked_add(delta)
                    .ok_or_else(|| CacheError::Operation(format!("increment overflow at {key}")))?;
                slot.get_mut().value = next.to_string();
                next
            }
            MapEntry::Occupied(mut slot) => {
                slot.insert(Entry {
                    value: delta.to_string(),
                    expires_at: None,
                });
                delta
            }
            MapEntry::Vacant(slot) => {
                slot.insert(Entry {
                    value: delta.to_string(),
                    expires_at: None,
                });
                delta
            }
        };
        self.note_write();
        Ok(next)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        let now = Instant::now();
        match self.entries.get_mut(key) {
            Some(mut e) if e.is_live(now) => {
                e.expires_at = Self::expiry(ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<u64> {
        let now = Instant::now();
        let removed = keys
            .iter()
            .filter_map(|k| self.entries.remove(k))
            .filter(|(_, e)| e.is_live(now))
            .count();
        Ok(removed as u64)
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let now = Instant::now();
        Ok(self.entries.get(key).is_some_and(|e| e.is_live(now)))
    }

    async fn health_check(&self) -> bool {
        true
    }
}
