//! PostgreSQL repository implementations.
//!
//! - [`PgLinkRepository`] - link storage and durable click totals
//! - [`PgUserRepository`] - user accounts

pub mod pg_link_repository;
pub mod pg_user_repository;

pub use pg_link_repository::PgLinkRepository;
pub use pg_user_repository::PgUserRepository;
