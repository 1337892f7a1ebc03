//! Application layer services implementing business logic.
//!
//! Services consume repository traits and the cache capability, and give the HTTP
//! layer one call per operation.
//!
//! - [`services::redirect_service::RedirectService`] - short code resolution
//! - [`services::click_counter::ClickCounter`] - batched click accounting
//! - [`services::link_service::LinkService`] - link lifecycle and listing
//! - [`services::cache_warmer::CacheWarmer`] - periodic cache preloading
//! - [`services::auth_service::AuthService`] - accounts and JWT authentication

pub mod services;
