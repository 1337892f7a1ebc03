//! Link creation, listing and deletion.

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::application::services::click_counter::ClickCounter;
use crate::config::EngineSettings;
use crate::domain::entities::{Link, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::infrastructure::cache::{CacheService, CachedTarget, keys};
use crate::utils::code_generator::{generate_code, validate_custom_code};
use crate::utils::url_validator::validate_long_url;

/// Attempts at finding a free generated code before giving up.
const MAX_GENERATION_ATTEMPTS: usize = 10;

/// Upper bound on anonymous link lifetime (10 years).
const MAX_EXPIRY_HOURS: i64 = 87_600;

pub const DEFAULT_PER_PAGE: i64 = 10;
pub const MAX_PER_PAGE: i64 = 100;

/// Who a new link belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOwner {
    /// Permanent link owned by a user.
    User(Uuid),
    /// Ownerless link with a limited lifetime.
    Anonymous,
}

#[derive(Debug, Clone, Default)]
pub struct CreateLinkRequest {
    pub long_url: String,
    pub custom_code: Option<String>,
    /// Only used for anonymous links. `None` or non-positive means the default.
    pub expiry_hours: Option<i64>,
}

/// Raw pagination input.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageRequest {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PageRequest {
    /// Returns `(page, per_page)` with page >= 1 and per_page in [1, 100].
    /// A missing or zero `per_page` defaults to 10.
    pub fn clamp(self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = match self.per_page {
            None | Some(0) => DEFAULT_PER_PAGE,
            Some(n) => n.clamp(1, MAX_PER_PAGE),
        };
        (page, per_page)
    }
}

#[derive(Debug, Clone)]
pub struct LinkPage {
    pub links: Vec<Link>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

impl LinkPage {
    pub fn total_pages(&self) -> i64 {
        (self.total + self.per_page - 1) / self.per_page
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkStats {
    pub total_clicks: i64,
    pub last_accessed_at: DateTime<Utc>,
}

/// Service owning the lifecycle of short links.
///
/// Store writes happen first; the cache is updated afterwards and a cache failure
/// never undoes a successful store write. Click counts returned by this service
/// always include clicks still pending in the cache.
pub struct LinkService<L: LinkRepository + ?Sized> {
    repository: Arc<L>,
    cache: Arc<dyn CacheService>,
    clicks: Arc<ClickCounter>,
    settings: EngineSettings,
}

impl<L: LinkRepository + ?Sized> LinkService<L> {
    pub fn new(
        repository: Arc<L>,
        cache: Arc<dyn CacheService>,
        clicks: Arc<ClickCounter>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            repository,
            cache,
            clicks,
            settings,
        }
    }

    /// Creates a permanent link owned by `user_id`.
    pub async fn create_for_user(
        &self,
        user_id: Uuid,
        long_url: String,
        custom_code: Option<String>,
    ) -> Result<Link, AppError> {
        self.create_link(
            LinkOwner::User(user_id),
            CreateLinkRequest {
                long_url,
                custom_code,
                expiry_hours: None,
            },
        )
        .await
    }

    /// Creates an ownerless link that expires after `expiry_hours` (default 168).
    pub async fn create_anonymous(
        &self,
        long_url: String,
        custom_code: Option<String>,
        expiry_hours: Option<i64>,
    ) -> Result<Link, AppError> {
        self.create_link(
            LinkOwner::Anonymous,
            CreateLinkRequest {
                long_url,
                custom_code,
                expiry_hours,
            },
        )
        .await
    }

    /// Creates a link and writes its mapping through to the cache.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidInput`] for a bad URL, custom code or expiry
    /// - [`AppError::CodeTaken`] if the custom code is in use, including a concurrent
    ///   creation caught by the unique constraint
    /// - [`AppError::GenerationFailed`] if no free code was found
    pub async fn create_link(
        &self,
        owner: LinkOwner,
        request: CreateLinkRequest,
    ) -> Result<Link, AppError> {
        let long_url = request.long_url.trim().to_string();
        validate_long_url(&long_url)?;

        let expires_at = match owner {
            LinkOwner::User(_) => None,
            LinkOwner::Anonymous => Some(self.anonymous_expiry(request.expiry_hours)?),
        };

        let short_code = match request.custom_code.as_deref().map(str::trim) {
            Some(custom) if !custom.is_empty() => {
                let code = validate_custom_code(custom)?;
                if self.is_code_taken(&code).await? {
                    return Err(AppError::code_taken(&code));
                }
                code
            }
            _ => self.generate_unique_code().await?,
        };

        let (owner_id, is_anonymous) = match owner {
            LinkOwner::User(id) => (Some(id), false),
            LinkOwner::Anonymous => (None, true),
        };

        let link = self
            .repository
            .create(NewLink {
                id: Uuid::new_v4(),
                owner_id,
                long_url,
                short_code,
                is_anonymous,
                expires_at,
            })
            .await?;

        tracing::info!(
            short_code = %link.short_code,
            anonymous = link.is_anonymous,
            "Link created"
        );

        self.write_through(&link).await;
        Ok(link)
    }

    /// Deletes the caller's link and evicts its cache entries.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the link does not exist or belongs to
    /// someone else.
    pub async fn delete_link(&self, owner_id: Uuid, link_id: Uuid) -> Result<(), AppError> {
        let link = self
            .repository
            .find_owned(owner_id, link_id)
            .await?
            .ok_or_else(AppError::link_not_found)?;

        if !self.repository.hard_delete(link.id).await? {
            return Err(AppError::link_not_found());
        }

        let [clicks, flushed] = keys::click_keys(&link.short_code);
        let evict = [keys::url_key(&link.short_code), clicks, flushed];
        if let Err(e) = self.cache.delete(&evict).await {
            tracing::warn!(
                short_code = %link.short_code,
                error = %e,
                "Cache eviction failed, entries will expire by TTL"
            );
        }

        tracing::info!(short_code = %link.short_code, %link_id, "Link deleted");
        Ok(())
    }

    /// Lists the owner's links, newest first, with merged click counts.
    pub async fn list_links_for_user(
        &self,
        owner_id: Uuid,
        request: PageRequest,
    ) -> Result<LinkPage, AppError> {
        let (page, per_page) = request.clamp();
        let offset = (page - 1).saturating_mul(per_page);

        let (mut links, total) = self
            .repository
            .list_by_owner(owner_id, offset, per_page)
            .await?;

        for link in &mut links {
            link.clicks = self.clicks.merged_total(link).await;
        }

        Ok(LinkPage {
            links,
            total,
            page,
            per_page,
        })
    }

    /// Returns one of the owner's links with its merged click count.
    pub async fn get_link(&self, owner_id: Uuid, link_id: Uuid) -> Result<Link, AppError> {
        let mut link = self
            .repository
            .find_owned(owner_id, link_id)
            .await?
            .ok_or_else(AppError::link_not_found)?;

        link.clicks = self.clicks.merged_total(&link).await;
        Ok(link)
    }

    pub async fn get_stats(&self, owner_id: Uuid, link_id: Uuid) -> Result<LinkStats, AppError> {
        let link = self.get_link(owner_id, link_id).await?;
        Ok(LinkStats {
            total_clicks: link.clicks,
            last_accessed_at: link.updated_at,
        })
    }

    /// Checks whether `code` is in use: a cached URL mapping first, then the store.
    ///
    /// Sentinels in the cache do not count as taken.
    pub async fn is_code_taken(&self, code: &str) -> Result<bool, AppError> {
        match self.cache.get(&keys::url_key(code)).await {
            Ok(Some(raw)) => {
                if !CachedTarget::parse(raw).is_sentinel() {
                    return Ok(true);
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(code, error = %e, "Cache check failed, asking the store"),
        }

        Ok(self.repository.count_by_short_code(code).await? > 0)
    }

    /// Generates a code that is free in both the cache and the store.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::GenerationFailed`] after 10 colliding attempts.
    pub async fn generate_unique_code(&self) -> Result<String, AppError> {
        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let code = generate_code()?;

            let in_cache = match self.cache.exists(&keys::url_key(&code)).await {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!(error = %e, "Cache lookup failed, asking the store");
                    false
                }
            };

            if !in_cache && self.repository.count_by_short_code(&code).await? == 0 {
                return Ok(code);
            }

            tracing::debug!(attempt, code, "Generated code collided");
        }

        Err(AppError::generation_failed(
            "Failed to generate a unique short code",
            json!({ "attempts": MAX_GENERATION_ATTEMPTS }),
        ))
    }

    fn anonymous_expiry(&self, expiry_hours: Option<i64>) -> Result<DateTime<Utc>, AppError> {
        let hours = match expiry_hours {
            Some(h) if h > MAX_EXPIRY_HOURS => {
                return Err(AppError::invalid_input(
                    "expiry_hours is too large",
                    json!({ "max": MAX_EXPIRY_HOURS, "provided": h }),
                ));
            }
            Some(h) if h > 0 => h,
            _ => self.settings.anonymous_expiry_hours,
        };
        Ok(Utc::now() + ChronoDuration::hours(hours))
    }

    /// Caches the new mapping and resets any counter left over from a previous
    /// link with the same code.
    async fn write_through(&self, link: &Link) {
        let Some(ttl) = link.cache_ttl(self.settings.url_cache_ttl, Utc::now()) else {
            return;
        };

        if let Err(e) = self.cache.delete(&keys::click_keys(&link.short_code)).await {
            tracing::warn!(short_code = %link.short_code, error = %e, "Failed to reset click counter");
        }

        if let Err(e) = self
            .cache
            .set(&keys::url_key(&link.short_code), &link.long_url, ttl)
            .await
        {
            metrics::counter!("cache_write_failures_total").increment(1);
            tracing::warn!(
                short_code = %link.short_code,
                error = %e,
                "Link stored but cache write-through failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::background_job::JobQueue;
    use crate::domain::repositories::MockLinkRepository;
    use crate::infrastructure::cache::MemoryCache;
    use std::time::Duration;

    fn stored(new_link: NewLink) -> Link {
        let now = Utc::now();
        Link {
            id: new_link.id,
            owner_id: new_link.owner_id,
            long_url: new_link.long_url,
            short_code: new_link.short_code,
            clicks: 0,
            is_anonymous: new_link.is_anonymous,
            expires_at: new_link.expires_at,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn service(
        repo: MockLinkRepository,
        cache: Arc<MemoryCache>,
    ) -> LinkService<MockLinkRepository> {
        let settings = EngineSettings::default();
        let (jobs, _rx) = JobQueue::new(16);
        let clicks = Arc::new(ClickCounter::new(cache.clone(), jobs, &settings));
        LinkService::new(Arc::new(repo), cache, clicks, settings)
    }

    #[test]
    fn test_page_request_clamp() {
        let clamp = |page, per_page| PageRequest { page, per_page }.clamp();

        assert_eq!(clamp(None, None), (1, 10));
        assert_eq!(clamp(Some(0), Some(1000)), (1, 100));
        assert_eq!(clamp(Some(-3), Some(0)), (1, 10));
        assert_eq!(clamp(Some(4), Some(-5)), (4, 1));
        assert_eq!(clamp(Some(2), Some(25)), (2, 25));
    }

    #[tokio::test]
    async fn test_huge_page_number_saturates_offset() {
        let owner = Uuid::new_v4();
        let mut repo = MockLinkRepository::new();
        repo.expect_list_by_owner()
            .withf(move |id, offset, limit| *id == owner && *offset == i64::MAX && *limit == 100)
            .times(1)
            .returning(|_, _, _| Ok((vec![], 3)));

        let page = service(repo, Arc::new(MemoryCache::new()))
            .list_links_for_user(
                owner,
                PageRequest {
                    page: Some(i64::MAX),
                    per_page: Some(100),
                },
            )
            .await
            .unwrap();

        assert!(page.links.is_empty());
        assert_eq!(page.page, i64::MAX);
        assert_eq!(page.total, 3);
    }

    #[test]
    fn test_total_pages() {
        let page = |total| LinkPage {
            links: vec![],
            total,
            page: 1,
            per_page: 10,
        };
        assert_eq!(page(0).total_pages(), 0);
        assert_eq!(page(10).total_pages(), 1);
        assert_eq!(page(11).total_pages(), 2);
    }

    #[tokio::test]
    async fn test_create_for_user_is_permanent_and_cached() {
        let owner = Uuid::new_v4();
        let mut repo = MockLinkRepository::new();
        repo.expect_count_by_short_code().returning(|_| Ok(0));
        repo.expect_create()
            .withf(move |l| l.owner_id == Some(owner) && !l.is_anonymous && l.expires_at.is_none())
            .times(1)
            .returning(|l| Ok(stored(l)));

        let cache = Arc::new(MemoryCache::new());
        let service = service(repo, cache.clone());

        let link = service
            .create_for_user(owner, "https://example.com".into(), None)
            .await
            .unwrap();

        assert_eq!(link.short_code.len(), 6);
        assert_eq!(
            cache
                .get(&format!("url:{}", link.short_code))
                .await
                .unwrap()
                .as_deref(),
            Some("https://example.com")
        );
    }

    #[tokio::test]
    async fn test_create_anonymous_default_expiry() {
        let mut repo = MockLinkRepository::new();
        repo.expect_count_by_short_code().returning(|_| Ok(0));
        repo.expect_create().returning(|l| Ok(stored(l)));

        let cache = Arc::new(MemoryCache::new());
        let service = service(repo, cache.clone());

        for hours in [None, Some(0), Some(-5)] {
            let link = service
                .create_anonymous("https://example.com".into(), None, hours)
                .await
                .unwrap();

            assert!(link.is_anonymous);
            assert!(link.owner_id.is_none());
            let lifetime = link.expires_at.unwrap() - link.created_at;
            assert!((lifetime - ChronoDuration::hours(168)).num_seconds().abs() < 5);

            let ttl = cache.ttl(&format!("url:{}", link.short_code)).unwrap();
            assert!(ttl > Duration::from_secs(167 * 3600));
        }
    }

    #[tokio::test]
    async fn test_create_rejects_huge_expiry() {
        let repo = MockLinkRepository::new();
        let service = service(repo, Arc::new(MemoryCache::new()));

        let result = service
            .create_anonymous("https://example.com".into(), None, Some(1_000_000))
            .await;
        assert!(matches!(result, Err(AppError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_custom_code_is_lowercased() {
        let mut repo = MockLinkRepository::new();
        repo.expect_count_by_short_code()
            .withf(|code| code == "promo2025")
            .returning(|_| Ok(0));
        repo.expect_create()
            .withf(|l| l.short_code == "promo2025")
            .returning(|l| Ok(stored(l)));

        let service = service(repo, Arc::new(MemoryCache::new()));

        let link = service
            .create_anonymous("https://example.com".into(), Some("Promo2025".into()), None)
            .await
            .unwrap();
        assert_eq!(link.short_code, "promo2025");
    }

    #[tokio::test]
    async fn test_custom_code_taken_in_store() {
        let mut repo = MockLinkRepository::new();
        repo.expect_count_by_short_code().returning(|_| Ok(1));
        repo.expect_create().times(0);

        let service = service(repo, Arc::new(MemoryCache::new()));

        let result = service
            .create_anonymous("https://example.com".into(), Some("promo2025".into()), None)
            .await;
        assert!(matches!(result, Err(AppError::CodeTaken { .. })));
    }

    #[tokio::test]
    async fn test_custom_code_taken_in_cache_skips_store() {
        let mut repo = MockLinkRepository::new();
        repo.expect_count_by_short_code().times(0);
        repo.expect_create().times(0);

        let cache = Arc::new(MemoryCache::new());
        cache
            .set("url:promo2025", "https://other.com", Duration::from_secs(60))
            .await
            .unwrap();
        let service = service(repo, cache);

        let result = service
            .create_anonymous("https://example.com".into(), Some("promo2025".into()), None)
            .await;
        assert!(matches!(result, Err(AppError::CodeTaken { .. })));
    }

    #[tokio::test]
    async fn test_sentinel_does_not_block_custom_code() {
        let mut repo = MockLinkRepository::new();
        repo.expect_count_by_short_code().returning(|_| Ok(0));
        repo.expect_create().returning(|l| Ok(stored(l)));

        let cache = Arc::new(MemoryCache::new());
        cache
            .set("url:promo2025", "NOT_FOUND", Duration::from_secs(60))
            .await
            .unwrap();
        cache.incr("clicks:promo2025").await.unwrap();
        let service = service(repo, cache.clone());

        service
            .create_anonymous("https://example.com".into(), Some("promo2025".into()), None)
            .await
            .unwrap();

        assert_eq!(
            cache.get("url:promo2025").await.unwrap().as_deref(),
            Some("https://example.com")
        );
        assert!(!cache.exists("clicks:promo2025").await.unwrap());
    }

    #[tokio::test]
    async fn test_generation_gives_up_after_ten_attempts() {
        let mut repo = MockLinkRepository::new();
        repo.expect_count_by_short_code().times(10).returning(|_| Ok(1));

        let service = service(repo, Arc::new(MemoryCache::new()));

        let result = service.generate_unique_code().await;
        assert!(matches!(result, Err(AppError::GenerationFailed { .. })));
    }

    #[tokio::test]
    async fn test_invalid_url_rejected() {
        let repo = MockLinkRepository::new();
        let service = service(repo, Arc::new(MemoryCache::new()));

        let result = service.create_anonymous("".into(), None, None).await;
        assert!(matches!(result, Err(AppError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_delete_requires_ownership() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_owned().returning(|_, _| Ok(None));
        repo.expect_hard_delete().times(0);

        let service = service(repo, Arc::new(MemoryCache::new()));

        let result = service.delete_link(Uuid::new_v4(), Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_evicts_cache() {
        let owner = Uuid::new_v4();
        let link = stored(NewLink {
            id: Uuid::new_v4(),
            owner_id: Some(owner),
            long_url: "https://example.com".into(),
            short_code: "abc123".into(),
            is_anonymous: false,
            expires_at: None,
        });
        let link_id = link.id;

        let mut repo = MockLinkRepository::new();
        repo.expect_find_owned()
            .withf(move |o, id| *o == owner && *id == link_id)
            .returning(move |_, _| Ok(Some(link.clone())));
        repo.expect_hard_delete().times(1).returning(|_| Ok(true));

        let cache = Arc::new(MemoryCache::new());
        cache
            .set("url:abc123", "https://example.com", Duration::from_secs(60))
            .await
            .unwrap();
        cache.incr("clicks:abc123").await.unwrap();
        cache.incr_by("clicks_flushed:abc123", 10).await.unwrap();
        let service = service(repo, cache.clone());

        service.delete_link(owner, link_id).await.unwrap();

        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_list_merges_pending_clicks() {
        let owner = Uuid::new_v4();
        let mut link = stored(NewLink {
            id: Uuid::new_v4(),
            owner_id: Some(owner),
            long_url: "https://example.com".into(),
            short_code: "abc123".into(),
            is_anonymous: false,
            expires_at: None,
        });
        link.clicks = 10;

        let mut repo = MockLinkRepository::new();
        repo.expect_list_by_owner()
            .withf(|_, offset, limit| *offset == 0 && *limit == 100)
            .returning(move |_, _, _| Ok((vec![link.clone()], 1)));

        let cache = Arc::new(MemoryCache::new());
        for _ in 0..13 {
            cache.incr("clicks:abc123").await.unwrap();
        }
        cache.incr_by("clicks_flushed:abc123", 10).await.unwrap();
        let service = service(repo, cache);

        let page = service
            .list_links_for_user(
                owner,
                PageRequest {
                    page: Some(0),
                    per_page: Some(1000),
                },
            )
            .await
            .unwrap();

        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, 100);
        assert_eq!(page.total, 1);
        // durable 10 + pending 3
        assert_eq!(page.links[0].clicks, 13);
    }
}
