//! Business logic services for the application layer.

pub mod auth_service;
pub mod cache_warmer;
pub mod click_counter;
pub mod link_service;
pub mod redirect_service;

pub use auth_service::{AuthService, AuthSettings};
pub use cache_warmer::CacheWarmer;
pub use click_counter::{ClickCounter, ClickRecorded};
pub use link_service::{LinkService, PageRequest};
pub use redirect_service::{RedirectService, Resolution};
