//! Infrastructure layer for external integrations.
//!
//! Implements the interfaces defined by the domain layer.
//!
//! - [`cache`] - fast cache (Redis and in-process)
//! - [`persistence`] - PostgreSQL repositories

pub mod cache;
pub mod persistence;
