//! Repository trait definitions for the domain layer.
//!
//! These traits abstract the durable store. Concrete implementations live in
//! `crate::infrastructure::persistence`; mock implementations are generated via
//! `mockall` for unit tests.
//!
//! - [`LinkRepository`] - short link storage and click totals
//! - [`UserRepository`] - user accounts

pub mod link_repository;
pub mod user_repository;

pub use link_repository::LinkRepository;
pub use user_repository::UserRepository;

#[cfg(test)]
pub use link_repository::MockLinkRepository;
#[cfg(test)]
pub use user_repository::MockUserRepository;
