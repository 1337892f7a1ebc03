//! Short code resolution through the cache/store hierarchy.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::application::services::click_counter::{ClickCounter, ClickRecorded};
use crate::config::EngineSettings;
use crate::domain::background_job::{BackgroundJob, JobQueue};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::infrastructure::cache::{CacheService, CachedTarget, keys};

/// Successful resolution of a short code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub long_url: String,
    pub click: ClickRecorded,
}

/// Resolves short codes to long URLs and counts the click.
///
/// Lookup order:
///
/// 1. `url:<code>` in the cache. A URL is a hit; a `NOT_FOUND`/`EXPIRED` sentinel
///    answers [`AppError::NotFound`] without touching the store.
/// 2. On a miss, the store. A missing row writes a `NOT_FOUND` sentinel; an expired
///    row is purged in the background and an `EXPIRED` sentinel is written; a live
///    row is written through to the cache.
///
/// Every failure a caller can observe is the same generic not-found error.
pub struct RedirectService<L: LinkRepository + ?Sized> {
    repository: Arc<L>,
    cache: Arc<dyn CacheService>,
    clicks: Arc<ClickCounter>,
    jobs: JobQueue,
    settings: EngineSettings,
}

impl<L: LinkRepository + ?Sized> RedirectService<L> {
    pub fn new(
        repository: Arc<L>,
        cache: Arc<dyn CacheService>,
        clicks: Arc<ClickCounter>,
        jobs: JobQueue,
        settings: EngineSettings,
    ) -> Self {
        Self {
            repository,
            cache,
            clicks,
            jobs,
            settings,
        }
    }

    /// Resolves `raw_code` (optionally prefixed with `/` or `urls/`) and records a click.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidInput`] if the code is empty after stripping the prefix
    /// - [`AppError::NotFound`] if the link does not exist or has expired
    /// - store errors on a cache miss are returned as-is
    pub async fn resolve(&self, raw_code: &str) -> Result<Resolution, AppError> {
        let short_code = normalize_code(raw_code)?;
        let url_key = keys::url_key(short_code);

        match self.cache.get(&url_key).await {
            Ok(Some(raw)) => match CachedTarget::parse(raw) {
                CachedTarget::Url(long_url) => {
                    metrics::counter!("cache_hits_total").increment(1);
                    tracing::debug!(short_code, "Cache hit");
                    let click = self.clicks.record(short_code).await;
                    return Ok(Resolution { long_url, click });
                }
                sentinel => {
                    metrics::counter!("sentinel_hits_total").increment(1);
                    tracing::debug!(short_code, ?sentinel, "Sentinel hit");
                    return Err(AppError::link_not_found());
                }
            },
            Ok(None) => {
                metrics::counter!("cache_misses_total").increment(1);
                tracing::debug!(short_code, "Cache miss");
            }
            Err(e) => {
                metrics::counter!("cache_misses_total").increment(1);
                tracing::warn!(short_code, error = %e, "Cache read failed, falling back to store");
            }
        }

        let Some(link) = self.repository.find_by_short_code(short_code).await? else {
            self.write_sentinel(&url_key, CachedTarget::NotFound).await;
            return Err(AppError::link_not_found());
        };

        let now = Utc::now();
        let Some(ttl) = link.cache_ttl(self.settings.url_cache_ttl, now) else {
            self.jobs.submit(BackgroundJob::PurgeExpired {
                id: link.id,
                short_code: link.short_code.clone(),
            });
            self.write_sentinel(&url_key, CachedTarget::Expired).await;
            return Err(AppError::link_not_found());
        };

        if let Err(e) = self.cache.set(&url_key, &link.long_url, ttl).await {
            metrics::counter!("cache_write_failures_total").increment(1);
            tracing::warn!(short_code, error = %e, "Write-through failed");
        }

        let click = self.clicks.record(short_code).await;
        Ok(Resolution {
            long_url: link.long_url,
            click,
        })
    }

    async fn write_sentinel(&self, url_key: &str, sentinel: CachedTarget) {
        if let Err(e) = self
            .cache
            .set(url_key, sentinel.as_value(), self.settings.sentinel_ttl)
            .await
        {
            metrics::counter!("cache_write_failures_total").increment(1);
            tracing::warn!(key = url_key, error = %e, "Failed to write sentinel");
        }
    }
}

/// Strips a leading `/` and an optional `urls/` prefix.
fn normalize_code(raw: &str) -> Result<&str, AppError> {
    let trimmed = raw.trim().trim_start_matches('/');
    let code = trimmed.strip_prefix("urls/").unwrap_or(trimmed);

    if code.is_empty() {
        return Err(AppError::invalid_input(
            "Short code is required",
            json!({ "short_code": raw }),
        ));
    }
    Ok(code)
}
