//! HTTP server initialization and runtime setup.
//!
//! Handles database connections, cache selection, background work and the Axum
//! server lifecycle.

use crate::application::services::{AuthSettings, CacheWarmer};
use crate::config::Config;
use crate::domain::background_job::JobQueue;
use crate::domain::background_worker::{WorkerSettings, run_background_worker};
use crate::domain::repositories::{LinkRepository, UserRepository};
use crate::infrastructure::cache::{CacheService, MemoryCache, RedisCache};
use crate::infrastructure::persistence::{PgLinkRepository, PgUserRepository};
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// How long shutdown waits for queued background jobs.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool and migrations
/// - Redis cache (in-process fallback when Redis is absent or unreachable)
/// - Background worker and cache warmer
/// - Axum HTTP server with graceful shutdown on Ctrl+C / SIGTERM
///
/// # Errors
///
/// Returns an error if the database is unreachable, migrations fail, or the
/// listener cannot bind.
pub async fn run(config: Config) -> Result<()> {
    let pool = connect_pool(&config).await?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to apply migrations")?;

    let cache = connect_cache(config.redis_url.as_deref()).await;

    let link_repository: Arc<dyn LinkRepository> = Arc::new(PgLinkRepository::new(pool.clone()));
    let user_repository: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(pool));

    let (jobs, job_rx) = JobQueue::new(config.background_queue_capacity);
    let worker = tokio::spawn(run_background_worker(
        job_rx,
        link_repository.clone(),
        cache.clone(),
        WorkerSettings {
            concurrency: config.background_worker_concurrency,
            job_timeout: config.engine.background_task_timeout,
            watermark_ttl: config.engine.click_counter_ttl,
        },
    ));
    tracing::info!(
        concurrency = config.background_worker_concurrency,
        "Background worker started"
    );

    let warmer = Arc::new(CacheWarmer::new(
        link_repository.clone(),
        cache.clone(),
        config.engine,
    ))
    .spawn();

    let auth = AuthSettings {
        jwt_secret: config.jwt_secret.clone(),
        access_token_minutes: config.access_token_minutes,
        refresh_token_days: config.refresh_token_days,
    };

    let state = AppState::new(
        link_repository,
        user_repository,
        cache,
        jobs,
        config.engine,
        &auth,
        config.base_url.clone(),
    );

    let app = app_router(state, &config.cors_allowed_origins);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    warmer.abort();

    // The router owned the last queue senders, so the worker now drains and exits.
    match tokio::time::timeout(DRAIN_TIMEOUT, worker).await {
        Ok(_) => tracing::info!("Background jobs drained"),
        Err(_) => tracing::warn!("Background jobs still running at shutdown"),
    }

    Ok(())
}

async fn connect_pool(config: &Config) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")
}

async fn connect_cache(redis_url: Option<&str>) -> Arc<dyn CacheService> {
    let Some(redis_url) = redis_url else {
        tracing::info!("Cache: in-process (Redis not configured)");
        return Arc::new(MemoryCache::new());
    };

    match RedisCache::connect(redis_url).await {
        Ok(redis) => {
            tracing::info!("Cache: Redis");
            Arc::new(redis)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to connect to Redis, using in-process cache");
            Arc::new(MemoryCache::new())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
