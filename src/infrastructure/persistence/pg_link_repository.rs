//! PostgreSQL implementation of the link repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::domain::entities::{Link, LinkSummary, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

#[derive(Debug, FromRow)]
struct LinkRow {
    id: Uuid,
    owner_id: Option<Uuid>,
    long_url: String,
    short_code: String,
    clicks: i64,
    is_anonymous: bool,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<LinkRow> for Link {
    fn from(r: LinkRow) -> Self {
        Link {
            id: r.id,
            owner_id: r.owner_id,
            long_url: r.long_url,
            short_code: r.short_code,
            clicks: r.clicks,
            is_anonymous: r.is_anonymous,
            expires_at: r.expires_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
            deleted_at: r.deleted_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct SummaryRow {
    total: i64,
    anonymous: i64,
    expired: i64,
    durable_clicks: i64,
}

/// PostgreSQL repository for link storage.
///
/// Queries are bound at runtime, so building the crate does not need a live
/// database.
#[derive(Clone)]
pub struct PgLinkRepository {
    pool: PgPool,
}

impl PgLinkRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError> {
        let row: LinkRow = sqlx::query_as(
            r#"
            INSERT INTO links (id, owner_id, long_url, short_code, is_anonymous, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, owner_id, long_url, short_code, clicks, is_anonymous,
                      expires_at, created_at, updated_at, deleted_at
            "#,
        )
            .bind(new_link.id)
            .bind(new_link.owner_id)
            .bind(&new_link.long_url)
            .bind(&new_link.short_code)
            .bind(new_link.is_anonymous)
            .bind(new_link.expires_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    async fn find_by_short_code(&self, short_code: &str) -> Result<Option<Link>, AppError> {
        let row: Option<LinkRow> = sqlx::query_as(
            r#"
            SELECT id, owner_id, long_url, short_code, clicks, is_anonymous,
                   expires_at, created_at, updated_at, deleted_at
            FROM links
            WHERE short_code = $1 AND deleted_at IS NULL
            "#,
        )
            .bind(short_code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Link::from))
    }

    async fn find_owned(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Link>, AppError> {
        let row: Option<LinkRow> = sqlx::query_as(
            r#"
            SELECT id, owner_id, long_url, short_code, clicks, is_anonymous,
                   expires_at, created_at, updated_at, deleted_at
            FROM links
            WHERE id = $1 AND owner_id = $2 AND deleted_at IS NULL
            "#,
        )
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Link::from))
    }

    async fn count_by_short_code(&self, short_code: &str) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM links WHERE short_code = $1 AND deleted_at IS NULL",
        )
        .bind(short_code)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn increment_clicks(&self, short_code: &str, delta: i64) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE links SET clicks = clicks + $2, updated_at = NOW() \
             WHERE short_code = $1 AND deleted_at IS NULL",
        )
        .bind(short_code)
        .bind(delta)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn hard_delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM links WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_by_owner(
        &self,
        owner_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Link>, i64), AppError> {
        let rows: Vec<LinkRow> = sqlx::query_as(
            r#"
            SELECT id, owner_id, long_url, short_code, clicks, is_anonymous,
                   expires_at, created_at, updated_at, deleted_at
            FROM links
            WHERE owner_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC, id
            LIMIT $2 OFFSET $3
            "#,
        )
            .bind(owner_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM links WHERE owner_id = $1 AND deleted_at IS NULL",
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows.into_iter().map(Link::from).collect(), total))
    }

    async fn top_by_clicks(&self, limit: i64) -> Result<Vec<Link>, AppError> {
        let rows: Vec<LinkRow> = sqlx::query_as(
            r#"
            SELECT id, owner_id, long_url, short_code, clicks, is_anonymous,
                   expires_at, created_at, updated_at, deleted_at
            FROM links
            WHERE deleted_at IS NULL AND (expires_at IS NULL OR expires_at > NOW())
            ORDER BY clicks DESC, created_at DESC
            LIMIT $1
            "#,
        )
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Link::from).collect())
    }

    async fn purge_expired(&self) -> Result<Vec<String>, AppError> {
        let codes: Vec<String> = sqlx::query_scalar(
            "DELETE FROM links WHERE expires_at IS NOT NULL AND expires_at <= NOW() \
             RETURNING short_code",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(codes)
    }

    async fn summary(&self) -> Result<LinkSummary, AppError> {
        let row: SummaryRow = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE is_anonymous) AS anonymous,
                COUNT(*) FILTER (WHERE expires_at IS NOT NULL AND expires_at <= NOW()) AS expired,
                COALESCE(SUM(clicks), 0)::BIGINT AS durable_clicks
            FROM links
            WHERE deleted_at IS NULL
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(LinkSummary {
            total: row.total,
            anonymous: row.anonymous,
            expired: row.expired,
            durable_clicks: row.durable_clicks,
        })
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
