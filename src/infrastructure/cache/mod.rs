//! Fast cache layer.
//!
//! Provides a [`CacheService`] trait with two implementations:
//! - [`RedisCache`] - production Redis-backed cache
//! - [`MemoryCache`] - in-process fallback, also used by tests
//!
//! [`keys`] defines the key namespaces shared by every component.

pub mod keys;
mod memory_cache;
mod redis_cache;
mod service;

pub use keys::CachedTarget;
pub use memory_cache::MemoryCache;
pub use redis_cache::RedisCache;
pub use service::{CacheError, CacheResult, CacheService};
