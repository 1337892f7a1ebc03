#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use lynx_shortener::application::services::AuthSettings;
use lynx_shortener::config::EngineSettings;
use lynx_shortener::domain::background_job::{BackgroundJob, JobQueue};
use lynx_shortener::domain::background_worker::{WorkerSettings, run_background_worker};
use lynx_shortener::domain::entities::{Link, LinkSummary, NewLink, NewUser, User};
use lynx_shortener::domain::repositories::{LinkRepository, UserRepository};
use lynx_shortener::error::AppError;
use lynx_shortener::infrastructure::cache::{CacheError, CacheResult, CacheService, MemoryCache};
use lynx_shortener::state::AppState;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret-that-is-at-least-32-characters";
pub const BASE_URL: &str = "http://lynx.test";
pub const PASSWORD: &str = "Str0ng!Passw0rd";

/// Link store backed by a vector, with the same uniqueness and expiry rules as
/// the PostgreSQL repository.
#[derive(Default)]
pub struct InMemoryLinkRepository {
    links: Mutex<Vec<Link>>,
}

impl InMemoryLinkRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, link: Link) {
        self.links.lock().unwrap().push(link);
    }

    pub fn get(&self, short_code: &str) -> Option<Link> {
        self.links
            .lock()
            .unwrap()
            .iter()
            .find(|l| l.short_code == short_code)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.links.lock().unwrap().len()
    }
}

#[async_trait]
impl LinkRepository for InMemoryLinkRepository {
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError> {
        let mut links = self.links.lock().unwrap();
        if links.iter().any(|l| l.short_code == new_link.short_code) {
            return Err(AppError::code_taken(&new_link.short_code));
        }

        // Distinct creation times keep newest-first ordering deterministic.
        let created_at = Utc::now() + ChronoDuration::microseconds(links.len() as i64);
        let link = Link {
            id: new_link.id,
            owner_id: new_link.owner_id,
            long_url: new_link.long_url,
            short_code: new_link.short_code,
            clicks: 0,
            is_anonymous: new_link.is_anonymous,
            expires_at: new_link.expires_at,
            created_at,
            updated_at: created_at,
            deleted_at: None,
        };
        links.push(link.clone());
        Ok(link)
    }

    async fn find_by_short_code(&self, short_code: &str) -> Result<Option<Link>, AppError> {
        Ok(self
            .links
            .lock()
            .unwrap()
            .iter()
            .find(|l| l.short_code == short_code && l.deleted_at.is_none())
            .cloned())
    }

    async fn find_owned(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Link>, AppError> {
        Ok(self
            .links
            .lock()
            .unwrap()
            .iter()
            .find(|l| l.id == id && l.is_owned_by(owner_id) && l.deleted_at.is_none())
            .cloned())
    }

    async fn count_by_short_code(&self, short_code: &str) -> Result<i64, AppError> {
        Ok(self
            .links
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.short_code == short_code && l.deleted_at.is_none())
            .count() as i64)
    }

    async fn increment_clicks(&self, short_code: &str, delta: i64) -> Result<u64, AppError> {
        let mut links = self.links.lock().unwrap();
        match links
            .iter_mut()
            .find(|l| l.short_code == short_code && l.deleted_at.is_none())
        {
            Some(link) => {
                link.clicks += delta;
                link.updated_at = Utc::now();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn hard_delete(&self, id: Uuid) -> Result<bool, AppError> {
        let mut links = self.links.lock().unwrap();
        let before = links.len();
        links.retain(|l| l.id != id);
        Ok(links.len() < before)
    }

    async fn list_by_owner(
        &self,
        owner_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Link>, i64), AppError> {
        let mut owned: Vec<Link> = self
            .links
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.is_owned_by(owner_id) && l.deleted_at.is_none())
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = owned.len() as i64;
        let page = owned
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn top_by_clicks(&self, limit: i64) -> Result<Vec<Link>, AppError> {
        let mut live: Vec<Link> = self
            .links
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.deleted_at.is_none() && !l.is_expired())
            .cloned()
            .collect();
        live.sort_by(|a, b| b.clicks.cmp(&a.clicks));
        live.truncate(limit as usize);
        Ok(live)
    }

    async fn purge_expired(&self) -> Result<Vec<String>, AppError> {
        let mut links = self.links.lock().unwrap();
        let purged = links
            .iter()
            .filter(|l| l.is_expired())
            .map(|l| l.short_code.clone())
            .collect();
        links.retain(|l| !l.is_expired());
        Ok(purged)
    }

    async fn summary(&self) -> Result<LinkSummary, AppError> {
        let links = self.links.lock().unwrap();
        let live = links.iter().filter(|l| l.deleted_at.is_none());
        Ok(live.fold(LinkSummary::default(), |mut acc, l| {
            acc.total += 1;
            acc.anonymous += l.is_anonymous as i64;
            acc.expired += l.is_expired() as i64;
            acc.durable_clicks += l.clicks;
            acc
        }))
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<Vec<User>>,
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == new_user.email) {
            return Err(AppError::conflict("Unique constraint violation", json!({})));
        }
        let now = Utc::now();
        let user = User {
            id: new_user.id,
            email: new_user.email,
            password_hash: new_user.password_hash,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            reset_token: None,
            reset_token_expires_at: None,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned())
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        if let Some(user) = self.users.lock().unwrap().iter_mut().find(|u| u.id == id) {
            user.reset_token = Some(token.to_string());
            user.reset_token_expires_at = Some(expires_at);
        }
        Ok(())
    }

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>, AppError> {
        let now = Utc::now();
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.reset_token_matches(token, now))
            .cloned())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError> {
        if let Some(user) = self.users.lock().unwrap().iter_mut().find(|u| u.id == id) {
            user.password_hash = password_hash.to_string();
            user.reset_token = None;
            user.reset_token_expires_at = None;
            user.updated_at = Utc::now();
        }
        Ok(())
    }
}

impl InMemoryUserRepository {
    pub fn by_email(&self, email: &str) -> Option<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned()
    }
}

/// Cache whose backend is always down.
pub struct UnavailableCache;

#[async_trait]
impl CacheService for UnavailableCache {
    async fn get(&self, _: &str) -> CacheResult<Option<String>> {
        Err(CacheError::Unavailable("connection refused".into()))
    }
    async fn set(&self, _: &str, _: &str, _: Duration) -> CacheResult<()> {
        Err(CacheError::Unavailable("connection refused".into()))
    }
    async fn incr_by(&self, _: &str, _: i64) -> CacheResult<i64> {
        Err(CacheError::Unavailable("connection refused".into()))
    }
    async fn expire(&self, _: &str, _: Duration) -> CacheResult<bool> {
        Err(CacheError::Unavailable("connection refused".into()))
    }
    async fn delete(&self, _: &[String]) -> CacheResult<u64> {
        Err(CacheError::Unavailable("connection refused".into()))
    }
    async fn exists(&self, _: &str) -> CacheResult<bool> {
        Err(CacheError::Unavailable("connection refused".into()))
    }
    async fn health_check(&self) -> bool {
        false
    }
}

pub struct TestApp {
    pub state: AppState,
    pub jobs: mpsc::Receiver<BackgroundJob>,
    pub cache: Arc<MemoryCache>,
    pub links: Arc<InMemoryLinkRepository>,
    pub users: Arc<InMemoryUserRepository>,
}

impl TestApp {
    /// Removes every job queued so far without running it.
    pub fn take_jobs(&mut self) -> Vec<BackgroundJob> {
        let mut jobs = Vec::new();
        while let Ok(job) = self.jobs.try_recv() {
            jobs.push(job);
        }
        jobs
    }

    /// Runs `jobs` through the background worker and waits for it.
    pub async fn run_jobs(&self, jobs: Vec<BackgroundJob>) {
        let (tx, rx) = mpsc::channel(jobs.len().max(1));
        for job in jobs {
            tx.send(job).await.unwrap();
        }
        drop(tx);

        let settings = WorkerSettings {
            concurrency: 4,
            job_timeout: Duration::from_secs(5),
            watermark_ttl: Duration::from_secs(30 * 24 * 60 * 60),
        };
        run_background_worker(rx, self.links.clone(), self.cache.clone(), settings).await;
    }

    /// Runs every job queued so far through the background worker and waits for it.
    pub async fn drain_jobs(&mut self) {
        let jobs = self.take_jobs();
        self.run_jobs(jobs).await;
    }
}

pub fn auth_settings() -> AuthSettings {
    AuthSettings {
        jwt_secret: JWT_SECRET.to_string(),
        access_token_minutes: 60,
        refresh_token_days: 7,
    }
}

pub fn test_app() -> TestApp {
    test_app_with(EngineSettings::default())
}

pub fn test_app_with(engine: EngineSettings) -> TestApp {
    let cache = Arc::new(MemoryCache::new());
    let links = Arc::new(InMemoryLinkRepository::new());
    let users = Arc::new(InMemoryUserRepository::default());
    let (queue, jobs) = JobQueue::new(1024);

    let state = AppState::new(
        links.clone(),
        users.clone(),
        cache.clone(),
        queue,
        engine,
        &auth_settings(),
        BASE_URL.to_string(),
    );

    TestApp {
        state,
        jobs,
        cache,
        links,
        users,
    }
}

/// State wired to a cache that is permanently down.
pub fn unavailable_cache_state() -> (AppState, Arc<InMemoryLinkRepository>) {
    let links = Arc::new(InMemoryLinkRepository::new());
    let users = Arc::new(InMemoryUserRepository::default());
    let (queue, _jobs) = JobQueue::new(1024);

    let state = AppState::new(
        links.clone(),
        users,
        Arc::new(UnavailableCache),
        queue,
        EngineSettings::default(),
        &auth_settings(),
        BASE_URL.to_string(),
    );
    (state, links)
}

/// A stored link with arbitrary expiry, bypassing creation rules.
pub fn stored_link(code: &str, url: &str, expires_in: Option<ChronoDuration>) -> Link {
    let now = Utc::now();
    Link {
        id: Uuid::new_v4(),
        owner_id: None,
        long_url: url.to_string(),
        short_code: code.to_string(),
        clicks: 0,
        is_anonymous: expires_in.is_some(),
        expires_at: expires_in.map(|d| now + d),
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}
