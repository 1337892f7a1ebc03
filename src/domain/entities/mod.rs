//! Core domain entities.
//!
//! Entities are plain data structures. Creation inputs live next to the entity
//! they produce (`NewLink`, `NewUser`).
//!
//! - [`Link`] - a short code mapped to a long URL, with its durable click count
//! - [`User`] - an account that owns permanent links

pub mod link;
pub mod user;

pub use link::{Link, LinkSummary, NewLink};
pub use user::{NewUser, User};
