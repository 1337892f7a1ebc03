//! Periodic preloading of the most clicked links into the cache.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::EngineSettings;
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::infrastructure::cache::{CacheService, keys};

pub struct CacheWarmer<L: LinkRepository + ?Sized> {
    repository: Arc<L>,
    cache: Arc<dyn CacheService>,
    settings: EngineSettings,
}

impl<L: LinkRepository + ?Sized + 'static> CacheWarmer<L> {
    pub fn new(repository: Arc<L>, cache: Arc<dyn CacheService>, settings: EngineSettings) -> Self {
        Self {
            repository,
            cache,
            settings,
        }
    }

    /// Loads the top-N links by durable clicks into the cache in one batch.
    ///
    /// TTLs follow the write-through rule: remaining lifetime for expiring links,
    /// the default TTL for permanent ones. Returns the number of entries written.
    pub async fn warm_top_links(&self) -> Result<usize, AppError> {
        let links = self
            .repository
            .top_by_clicks(self.settings.cache_warm_top_n)
            .await?;

        let now = Utc::now();
        let entries: Vec<_> = links
            .iter()
            .filter_map(|link| {
                link.cache_ttl(self.settings.url_cache_ttl, now)
                    .map(|ttl| (keys::url_key(&link.short_code), link.long_url.clone(), ttl))
            })
            .collect();

        self.cache.set_many(&entries).await.map_err(|e| {
            metrics::counter!("cache_write_failures_total").increment(1);
            AppError::internal("Cache warming failed", json!({ "reason": e.to_string() }))
        })?;

        metrics::counter!("cache_warm_links_total").increment(entries.len() as u64);
        tracing::info!(count = entries.len(), "Cache warmed with top links");
        Ok(entries.len())
    }

    /// Runs a warming pass now and then every `cache_warm_interval`.
    ///
    /// Failures are logged; the loop keeps going until the task is aborted.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.settings.cache_warm_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if let Err(e) = self.warm_top_links().await {
                    tracing::error!(error = %e, "Cache warming pass failed");
                }
            }
        })
    }
}
