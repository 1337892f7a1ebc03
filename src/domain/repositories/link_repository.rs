//! Repository trait for short link data access.

use crate::domain::entities::{Link, LinkSummary, NewLink};
use crate::error::AppError;
use async_trait::async_trait;
use uuid::Uuid;

/// Repository interface for the durable link store.
///
/// Every lookup ignores rows with `deleted_at` set. The store is the source of
/// truth for mappings; the cache only ever holds derived copies.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgLinkRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Persists a new link with a zero click count.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::CodeTaken`] if the short code is already in use.
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError>;

    /// Finds a link by its short code.
    ///
    /// Expired rows are returned as-is; the caller decides what expiry means.
    async fn find_by_short_code(&self, short_code: &str) -> Result<Option<Link>, AppError>;

    /// Finds a link by id, restricted to links owned by `owner_id`.
    async fn find_owned(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Link>, AppError>;

    /// Counts live rows holding `short_code` (0 or 1).
    async fn count_by_short_code(&self, short_code: &str) -> Result<i64, AppError>;

    /// Atomically adds `delta` to the durable click count.
    ///
    /// Returns the number of rows affected. Zero means the link is gone, which
    /// callers treat as success.
    async fn increment_clicks(&self, short_code: &str, delta: i64) -> Result<u64, AppError>;

    /// Physically removes the row. Returns `false` if nothing was deleted.
    async fn hard_delete(&self, id: Uuid) -> Result<bool, AppError>;

    /// Lists an owner's links, newest first, plus the owner's total link count.
    async fn list_by_owner(
        &self,
        owner_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Link>, i64), AppError>;

    /// Returns the `limit` non-expired links with the highest durable click counts.
    async fn top_by_clicks(&self, limit: i64) -> Result<Vec<Link>, AppError>;

    /// Removes every link whose expiry has passed. Returns the removed short codes.
    async fn purge_expired(&self) -> Result<Vec<String>, AppError>;

    /// Aggregate counts over the table, used by the admin CLI.
    async fn summary(&self) -> Result<LinkSummary, AppError>;

    /// Cheap round-trip used by health checks.
    async fn ping(&self) -> Result<(), AppError>;
}
