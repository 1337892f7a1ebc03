//! REST API layer for HTTP request/response handling.
//!
//! - [`dto`] - request/response serialization
//! - [`handlers`] - HTTP request handlers
//! - [`middleware`] - authentication, rate limiting and tracing
//! - [`routes`] - route groups

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
