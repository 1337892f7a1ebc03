//! HTTP middleware: JWT authentication, CORS, rate limiting and request tracing.

pub mod auth;
pub mod cors;
pub mod rate_limit;
pub mod tracing;
