//! Per-IP rate limiting (token bucket via `tower_governor`).
//!
//! Keys are the socket peer address, so the server must be started with
//! `into_make_service_with_connect_info::<SocketAddr>()`. Requests over the limit
//! receive `429 Too Many Requests`.

use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use std::sync::Arc;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::PeerIpKeyExtractor,
};

pub type RateLimitLayer =
    GovernorLayer<PeerIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Refill rate and bucket size of one limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub per_second: u64,
    pub burst: u32,
}

/// Anonymous endpoints.
pub const PUBLIC: RateLimit = RateLimit {
    per_second: 2,
    burst: 100,
};

/// Credential and bearer-protected endpoints.
pub const AUTHENTICATED: RateLimit = RateLimit {
    per_second: 1,
    burst: 10,
};

impl RateLimit {
    pub fn layer(self) -> RateLimitLayer {
        let config = GovernorConfigBuilder::default()
            .per_second(self.per_second.max(1))
            .burst_size(self.burst.max(1))
            .finish()
            .expect("period and burst are non-zero");

        GovernorLayer::new(Arc::new(config))
    }
}

/// Limiter for anonymous link creation.
pub fn layer() -> RateLimitLayer {
    PUBLIC.layer()
}

/// Stricter limiter for login, registration and account endpoints.
pub fn secure_layer() -> RateLimitLayer {
    AUTHENTICATED.layer()
}
