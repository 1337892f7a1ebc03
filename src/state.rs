//! Shared application state injected into every handler.

use std::sync::Arc;

use crate::application::services::{
    AuthService, AuthSettings, ClickCounter, LinkService, RedirectService,
};
use crate::config::EngineSettings;
use crate::domain::background_job::JobQueue;
use crate::domain::repositories::{LinkRepository, UserRepository};
use crate::infrastructure::cache::CacheService;

/// Services and collaborators wired once at startup.
///
/// Everything is behind `Arc`, so cloning the state per request is cheap. The
/// repositories are trait objects, which lets tests swap PostgreSQL for
/// in-memory implementations.
#[derive(Clone)]
pub struct AppState {
    pub link_service: Arc<LinkService<dyn LinkRepository>>,
    pub redirect_service: Arc<RedirectService<dyn LinkRepository>>,
    pub auth_service: Arc<AuthService<dyn UserRepository>>,
    pub link_repository: Arc<dyn LinkRepository>,
    pub cache: Arc<dyn CacheService>,
    pub jobs: JobQueue,
    pub base_url: String,
}

impl AppState {
    pub fn new(
        link_repository: Arc<dyn LinkRepository>,
        user_repository: Arc<dyn UserRepository>,
        cache: Arc<dyn CacheService>,
        jobs: JobQueue,
        engine: EngineSettings,
        auth: &AuthSettings,
        base_url: String,
    ) -> Self {
        let clicks = Arc::new(ClickCounter::new(cache.clone(), jobs.clone(), &engine));

        let link_service = Arc::new(LinkService::new(
            link_repository.clone(),
            cache.clone(),
            clicks.clone(),
            engine,
        ));
        let redirect_service = Arc::new(RedirectService::new(
            link_repository.clone(),
            cache.clone(),
            clicks,
            jobs.clone(),
            engine,
        ));
        let auth_service = Arc::new(AuthService::new(user_repository, cache.clone(), auth));

        Self {
            link_service,
            redirect_service,
            auth_service,
            link_repository,
            cache,
            jobs,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Public URL of a short code.
    pub fn short_url(&self, short_code: &str) -> String {
        format!("{}/urls/{}", self.base_url, short_code)
    }
}
