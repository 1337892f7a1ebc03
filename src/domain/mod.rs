//! Domain layer containing business entities and contracts.
//!
//! The domain layer has no dependency on infrastructure. Repository traits define
//! the contracts implemented by `crate::infrastructure::persistence`; business
//! rules live in [`crate::application::services`].
//!
//! - [`entities`] - core data structures
//! - [`repositories`] - durable store contracts
//! - [`background_job`] - detached work and the bounded queue that carries it
//! - [`background_worker`] - executor for that queue
//!
//! # Click flush flow
//!
//! 1. A resolution increments `clicks:<code>` in the cache
//! 2. Crossing a multiple of the batch size submits [`background_job::BackgroundJob::FlushClicks`]
//! 3. [`background_worker::run_background_worker`] adds the batch to the durable count

pub mod background_job;
pub mod background_worker;
pub mod entities;
pub mod repositories;
