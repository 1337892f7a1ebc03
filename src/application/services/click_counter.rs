//! Batched click accounting.
//!
//! Every click increments `clicks:<code>` in the cache. Each time that running
//! counter reaches a positive multiple of the batch size B, exactly B clicks are
//! handed to the background queue as a relative increment of the durable count.
//! The counter itself is never reset by a flush.
//!
//! A successful flush advances the watermark `clicks_flushed:<code>` by the same
//! delta. The observable total is `durable + (counter - watermark)`, so a batch
//! stays visible while its flush is queued, and a flush that is dropped or fails
//! leaves its clicks pending instead of hiding them. If the cache loses the
//! counter, at most B-1 clicks are lost.

use std::sync::Arc;
use std::time::Duration;

use crate::config::EngineSettings;
use crate::domain::background_job::{BackgroundJob, JobQueue};
use crate::domain::entities::Link;
use crate::infrastructure::cache::{CacheService, keys};

/// Outcome of recording one click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickRecorded {
    /// The cache counter now reads `counter`. `flush_scheduled` is set when this
    /// click completed a batch.
    Counted { counter: i64, flush_scheduled: bool },
    /// The cache was unavailable; the click was not counted.
    Skipped,
}

pub struct ClickCounter {
    cache: Arc<dyn CacheService>,
    jobs: JobQueue,
    batch_size: i64,
    counter_ttl: Duration,
}

impl ClickCounter {
    pub fn new(cache: Arc<dyn CacheService>, jobs: JobQueue, settings: &EngineSettings) -> Self {
        Self {
            cache,
            jobs,
            batch_size: settings.click_batch_size.max(1),
            counter_ttl: settings.click_counter_ttl,
        }
    }

    /// Counts one click for `short_code`.
    ///
    /// The increment is visible in the cache before this returns. Cache failures
    /// are logged and the click is skipped; they never fail the caller.
    pub async fn record(&self, short_code: &str) -> ClickRecorded {
        let key = keys::clicks_key(short_code);

        let counter = match self.cache.incr(&key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(short_code, error = %e, "Click not counted, cache unavailable");
                return ClickRecorded::Skipped;
            }
        };
        metrics::counter!("clicks_recorded_total").increment(1);

        if let Err(e) = self.cache.expire(&key, self.counter_ttl).await {
            tracing::warn!(short_code, error = %e, "Failed to refresh click counter TTL");
        }

        // A fresh counter starts a new generation; the old watermark is meaningless.
        if counter == 1 {
            if let Err(e) = self.cache.delete(&[keys::flushed_key(short_code)]).await {
                tracing::warn!(short_code, error = %e, "Failed to reset flush watermark");
            }
        }

        let flush_scheduled = counter > 0 && counter % self.batch_size == 0;
        if flush_scheduled {
            self.jobs.submit(BackgroundJob::FlushClicks {
                short_code: short_code.to_string(),
                delta: self.batch_size,
            });
        }

        tracing::debug!(short_code, counter, flush_scheduled, "Click recorded");

        ClickRecorded::Counted {
            counter,
            flush_scheduled,
        }
    }

    /// Clicks counted in the cache but not yet added to the durable count.
    ///
    /// Returns 0 when the counter is missing or the cache is unavailable.
    pub async fn pending(&self, short_code: &str) -> i64 {
        let Some(counter) = self.read(&keys::clicks_key(short_code), short_code).await else {
            return 0;
        };
        let Some(flushed) = self.read(&keys::flushed_key(short_code), short_code).await else {
            return 0;
        };
        (counter - flushed).max(0)
    }

    /// Integer at `key`, 0 when missing, `None` when the cache cannot answer.
    async fn read(&self, key: &str, short_code: &str) -> Option<i64> {
        match self.cache.get(key).await {
            Ok(Some(raw)) => match raw.parse::<i64>() {
                Ok(value) => Some(value.max(0)),
                Err(_) => {
                    tracing::warn!(short_code, key, value = %raw, "Click counter is not an integer");
                    None
                }
            },
            Ok(None) => Some(0),
            Err(e) => {
                tracing::warn!(short_code, error = %e, "Pending clicks unavailable, using durable count");
                None
            }
        }
    }

    /// Durable click count of `link` plus its pending clicks.
    pub async fn merged_total(&self, link: &Link) -> i64 {
        link.clicks + self.pending(&link.short_code).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::cache::{CacheError, CacheResult, MemoryCache};
    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    struct DownCache;

    #[async_trait]
    impl CacheService for DownCache {
        async fn get(&self, _: &str) -> CacheResult<Option<String>> {
            Err(CacheError::Unavailable("down".into()))
        }
        async fn set(&self, _: &str, _: &str, _: Duration) -> CacheResult<()> {
            Err(CacheError::Unavailable("down".into()))
        }
        async fn incr_by(&self, _: &str, _: i64) -> CacheResult<i64> {
            Err(CacheError::Unavailable("down".into()))
        }
        async fn expire(&self, _: &str, _: Duration) -> CacheResult<bool> {
            Err(CacheError::Unavailable("down".into()))
        }
        async fn delete(&self, _: &[String]) -> CacheResult<u64> {
            Err(CacheError::Unavailable("down".into()))
        }
        async fn exists(&self, _: &str) -> CacheResult<bool> {
            Err(CacheError::Unavailable("down".into()))
        }
        async fn health_check(&self) -> bool {
            false
        }
    }

    fn counter(
        cache: Arc<dyn CacheService>,
    ) -> (ClickCounter, mpsc::Receiver<BackgroundJob>) {
        let (jobs, rx) = JobQueue::new(64);
        (
            ClickCounter::new(cache, jobs, &EngineSettings::default()),
            rx,
        )
    }

    fn link(code: &str, clicks: i64) -> Link {
        let now = Utc::now();
        Link {
            id: Uuid::new_v4(),
            owner_id: None,
            long_url: "https://example.com".into(),
            short_code: code.into(),
            clicks,
            is_anonymous: false,
            expires_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn test_flush_on_each_batch_boundary() {
        let (clicks, mut rx) = counter(Arc::new(MemoryCache::new()));

        for i in 1..=25 {
            let recorded = clicks.record("abc123").await;
            assert_eq!(
                recorded,
                ClickRecorded::Counted {
                    counter: i,
                    flush_scheduled: i % 10 == 0,
                }
            );
        }

        let mut jobs = Vec::new();
        while let Ok(job) = rx.try_recv() {
            jobs.push(job);
        }
        assert_eq!(
            jobs,
            vec![
                BackgroundJob::FlushClicks {
                    short_code: "abc123".into(),
                    delta: 10
                };
                2
            ]
        );
    }

    #[tokio::test]
    async fn test_pending_is_counter_minus_watermark() {
        let cache = Arc::new(MemoryCache::new());
        let (clicks, _rx) = counter(cache.clone());

        for _ in 0..23 {
            clicks.record("abc123").await;
        }
        // Two batches queued, none flushed yet.
        assert_eq!(clicks.pending("abc123").await, 23);
        assert_eq!(clicks.merged_total(&link("abc123", 0)).await, 23);

        cache.incr_by("clicks_flushed:abc123", 20).await.unwrap();
        assert_eq!(clicks.pending("abc123").await, 3);
        assert_eq!(clicks.merged_total(&link("abc123", 20)).await, 23);
        assert_eq!(clicks.pending("unknown").await, 0);
    }

    #[tokio::test]
    async fn test_total_does_not_drop_at_batch_boundary() {
        let (clicks, _rx) = counter(Arc::new(MemoryCache::new()));

        for expected in 1..=10 {
            clicks.record("abc123").await;
            assert_eq!(clicks.merged_total(&link("abc123", 0)).await, expected);
        }
    }

    #[tokio::test]
    async fn test_fresh_counter_resets_watermark() {
        let cache = Arc::new(MemoryCache::new());
        cache.incr_by("clicks_flushed:abc123", 30).await.unwrap();
        let (clicks, _rx) = counter(cache.clone());

        clicks.record("abc123").await;

        assert!(!cache.exists("clicks_flushed:abc123").await.unwrap());
        assert_eq!(clicks.pending("abc123").await, 1);
    }

    #[tokio::test]
    async fn test_counter_gets_ttl() {
        let cache = Arc::new(MemoryCache::new());
        let (clicks, _rx) = counter(cache.clone());

        clicks.record("abc123").await;

        let ttl = cache.ttl("clicks:abc123").unwrap();
        assert!(ttl > Duration::from_secs(29 * 24 * 60 * 60));
    }

    #[tokio::test]
    async fn test_cache_outage_skips_click() {
        let (clicks, mut rx) = counter(Arc::new(DownCache));

        assert_eq!(clicks.record("abc123").await, ClickRecorded::Skipped);
        assert_eq!(clicks.merged_total(&link("abc123", 40)).await, 40);
        assert!(rx.try_recv().is_err());
    }
}
