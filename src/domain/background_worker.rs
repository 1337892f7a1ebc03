//! Executor for [`BackgroundJob`]s.
//!
//! Jobs run concurrently up to a fixed limit, each under its own deadline that is
//! independent of the request which produced it. Failures are logged and counted,
//! never retried. A failed click flush leaves the flush watermark untouched, so
//! its clicks remain visible as pending for as long as the cache counter lives.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;

use crate::domain::background_job::BackgroundJob;
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::infrastructure::cache::{CacheService, keys};

/// Tuning for [`run_background_worker`].
#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub concurrency: usize,
    pub job_timeout: Duration,
    /// TTL given to the flush watermark, matching the click counter's.
    pub watermark_ttl: Duration,
}

struct JobContext {
    repo: Arc<dyn LinkRepository>,
    cache: Arc<dyn CacheService>,
    watermark_ttl: Duration,
}

/// Consumes jobs until every [`crate::domain::background_job::JobQueue`] handle is
/// dropped, then waits for the jobs still in flight before returning.
pub async fn run_background_worker(
    mut rx: mpsc::Receiver<BackgroundJob>,
    repo: Arc<dyn LinkRepository>,
    cache: Arc<dyn CacheService>,
    settings: WorkerSettings,
) {
    let WorkerSettings {
        concurrency,
        job_timeout,
        watermark_ttl,
    } = settings;
    let ctx = Arc::new(JobContext {
        repo,
        cache,
        watermark_ttl,
    });
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut in_flight = JoinSet::new();

    tracing::info!(concurrency, ?job_timeout, "Background worker started");

    while let Some(job) = rx.recv().await {
        // Reap finished tasks so the set does not grow unbounded.
        while in_flight.try_join_next().is_some() {}

        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let ctx = ctx.clone();

        in_flight.spawn(async move {
            let _permit = permit;
            execute(job, &ctx, job_timeout).await;
        });
    }

    while in_flight.join_next().await.is_some() {}

    tracing::info!("Background worker stopped");
}

async fn execute(job: BackgroundJob, ctx: &JobContext, job_timeout: Duration) {
    let kind = job.kind();
    let short_code = job.short_code().to_string();

    match tokio::time::timeout(job_timeout, run_job(job, ctx)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            record_failure(kind);
            tracing::error!(kind, short_code, error = %e, "Background job failed");
        }
        Err(_) => {
            record_failure(kind);
            tracing::error!(kind, short_code, ?job_timeout, "Background job timed out");
        }
    }
}

async fn run_job(job: BackgroundJob, ctx: &JobContext) -> Result<(), AppError> {
    match job {
        BackgroundJob::FlushClicks { short_code, delta } => {
            let rows = ctx.repo.increment_clicks(&short_code, delta).await?;
            metrics::counter!("click_flushes_total").increment(1);
            if rows == 0 {
                tracing::debug!(short_code, delta, "Flush target no longer exists");
            } else {
                advance_watermark(ctx, &short_code, delta).await;
                tracing::debug!(short_code, delta, "Clicks flushed");
            }
        }
        BackgroundJob::PurgeExpired { id, short_code } => {
            let removed = ctx.repo.hard_delete(id).await?;
            if removed {
                if let Err(e) = ctx.cache.delete(&keys::click_keys(&short_code)).await {
                    tracing::warn!(short_code, error = %e, "Click counter left to expire by TTL");
                }
                metrics::counter!("expired_links_purged_total").increment(1);
                tracing::info!(short_code, %id, "Expired link purged");
            }
        }
    }
    Ok(())
}

async fn advance_watermark(ctx: &JobContext, short_code: &str, delta: i64) {
    let key = keys::flushed_key(short_code);
    let result = match ctx.cache.incr_by(&key, delta).await {
        Ok(_) => ctx.cache.expire(&key, ctx.watermark_ttl).await.map(|_| ()),
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        tracing::warn!(short_code, delta, error = %e, "Flush watermark not advanced");
    }
}

fn record_failure(kind: &'static str) {
    if kind == "flush_clicks" {
        metrics::counter!("click_flush_failures_total").increment(1);
    }
}
