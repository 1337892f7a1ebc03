//! CLI administration tool for lynx-shortener.
//!
//! Inspects and maintains the link store without going through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Link and click totals
//! cargo run --bin admin -- stats
//!
//! # Most clicked links
//! cargo run --bin admin -- links top --limit 20
//!
//! # Remove expired links (asks for confirmation)
//! cargo run --bin admin -- links purge-expired
//!
//! # Preload the most clicked links into Redis
//! cargo run --bin admin -- cache warm
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` (or `DB_HOST`/`DB_USER`/...): PostgreSQL connection
//! - `REDIS_URL` (or `REDIS_HOST`/...): required by `cache warm` only

use lynx_shortener::application::services::CacheWarmer;
use lynx_shortener::config::{Config, EngineSettings};
use lynx_shortener::domain::repositories::LinkRepository;
use lynx_shortener::infrastructure::cache::{CacheService, RedisCache, keys};
use lynx_shortener::infrastructure::persistence::PgLinkRepository;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use sqlx::PgPool;
use std::sync::Arc;

/// CLI tool for managing lynx-shortener.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show link and click totals
    Stats,

    /// Link maintenance
    Links {
        #[command(subcommand)]
        action: LinksAction,
    },

    /// Cache maintenance
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum LinksAction {
    /// List the most clicked links
    Top {
        #[arg(short, long, default_value_t = 10)]
        limit: i64,
    },

    /// Delete every link whose expiry has passed
    PurgeExpired {
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Preload the most clicked links into the cache
    Warm,
}

#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show database info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let database_url = Config::load_database_url()?;
    let pool = PgPool::connect(&database_url)
        .await
        .context("Failed to connect to database")?;
    let repo = Arc::new(PgLinkRepository::new(pool.clone()));

    match cli.command {
        Commands::Stats => handle_stats(repo.as_ref()).await?,
        Commands::Links { action } => handle_links_action(action, repo.as_ref()).await?,
        Commands::Cache { action } => handle_cache_action(action, repo).await?,
        Commands::Db { action } => handle_db_action(action, &pool).await?,
    }

    Ok(())
}

/// Prints link counts and the durable click total.
///
/// Clicks still buffered in the cache are not included.
async fn handle_stats(repo: &PgLinkRepository) -> Result<()> {
    println!("{}", "Statistics".bright_blue().bold());
    println!();

    let summary = repo.summary().await?;

    println!(
        "  Links:          {}",
        summary.total.to_string().bright_green().bold()
    );
    println!(
        "  Anonymous:      {}",
        summary.anonymous.to_string().bright_white()
    );
    println!(
        "  Expired:        {}",
        summary.expired.to_string().yellow()
    );
    println!(
        "  Durable clicks: {}",
        summary.durable_clicks.to_string().bright_green().bold()
    );
    println!();

    Ok(())
}

async fn handle_links_action(action: LinksAction, repo: &PgLinkRepository) -> Result<()> {
    match action {
        LinksAction::Top { limit } => {
            println!("{}", "Top links".bright_blue().bold());
            println!();

            let links = repo.top_by_clicks(limit.clamp(1, 1000)).await?;
            if links.is_empty() {
                println!("{}", "  No links found".yellow());
                return Ok(());
            }

            println!(
                "  {:<22} {:>10}  {}",
                "Code".bright_white().bold(),
                "Clicks".bright_white().bold(),
                "Target".bright_white().bold()
            );
            println!("  {}", "-".repeat(75).bright_black());

            for link in &links {
                let code = if link.is_expired() {
                    link.short_code.yellow()
                } else {
                    link.short_code.cyan()
                };
                println!(
                    "  {:<22} {:>10}  {}",
                    code,
                    link.clicks.to_string().bright_green(),
                    link.long_url.bright_black()
                );
            }
            println!();
        }
        LinksAction::PurgeExpired { yes } => {
            let summary = repo.summary().await?;
            if summary.expired == 0 {
                println!("{}", "No expired links".green());
                return Ok(());
            }

            println!(
                "  Expired links: {}",
                summary.expired.to_string().yellow().bold()
            );

            if !yes {
                let confirmed = Confirm::new()
                    .with_prompt("Delete them permanently?")
                    .default(false)
                    .interact()?;

                if !confirmed {
                    println!("{}", "Cancelled".red());
                    return Ok(());
                }
            }

            let removed = repo.purge_expired().await?;
            println!(
                "{} {}",
                "Deleted expired links:".green().bold(),
                removed.len().to_string().bright_white()
            );

            drop_click_counters(&removed).await;
        }
    }

    Ok(())
}

/// Removes the cache counters of purged links when Redis is configured.
async fn drop_click_counters(codes: &[String]) {
    if codes.is_empty() {
        return;
    }
    let Some(redis_url) = Config::load_redis_url() else {
        return;
    };

    let cache = match RedisCache::connect(&redis_url).await {
        Ok(cache) => cache,
        Err(e) => {
            println!(
                "{} {}",
                "Click counters left to expire, Redis unreachable:".yellow(),
                e
            );
            return;
        }
    };

    let counter_keys: Vec<String> = codes.iter().flat_map(|c| keys::click_keys(c)).collect();
    match cache.delete(&counter_keys).await {
        Ok(n) => println!(
            "{} {}",
            "Deleted click counters:".green().bold(),
            n.to_string().bright_white()
        ),
        Err(e) => println!("{} {}", "Failed to delete click counters:".yellow(), e),
    }
}

async fn handle_cache_action(action: CacheAction, repo: Arc<PgLinkRepository>) -> Result<()> {
    match action {
        CacheAction::Warm => {
            let redis_url = Config::load_redis_url()
                .context("REDIS_URL must be set to warm the cache")?;
            let cache = RedisCache::connect(&redis_url)
                .await
                .context("Failed to connect to Redis")?;

            let warmer = CacheWarmer::new(repo, Arc::new(cache), EngineSettings::from_env());
            let count = warmer.warm_top_links().await?;

            println!(
                "{} {}",
                "Cached links:".green().bold(),
                count.to_string().bright_white()
            );
        }
    }

    Ok(())
}

async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            println!("{}", "Database connection OK".green().bold());
        }
        DbAction::Info => {
            println!("{}", "Database Information".bright_blue().bold());
            println!();

            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(pool)
                .await?;
            let migrations: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
                .fetch_one(pool)
                .await
                .unwrap_or(0);

            println!("  PostgreSQL: {}", version.bright_white());
            println!("  Migrations: {}", migrations.to_string().bright_white());
            println!();
        }
    }

    Ok(())
}
