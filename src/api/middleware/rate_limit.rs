//! Per-client rate limiting using the token bucket algorithm.

use axum::body::Body;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use std::sync::Arc;
use tower_governor::{
    GovernorLayer,
    governor::GovernorConfigBuilder,
    key_extractor::{KeyExtractor, PeerIpKeyExtractor, SmartIpKeyExtractor},
};

/// Key extractor chosen at startup from `BEHIND_PROXY`.
///
/// Behind a proxy the client address comes from forwarding headers;
/// otherwise from the socket peer.
#[derive(Debug, Clone, Copy)]
pub enum ClientIpKeyExtractor {
    Peer,
    Forwarded,
}

impl KeyExtractor for ClientIpKeyExtractor {
    type Key = std::net::IpAddr;

    fn extract<T>(
        &self,
        req: &axum::http::Request<T>,
    ) -> Result<Self::Key, tower_governor::GovernorError> {
        match self {
            Self::Peer => PeerIpKeyExtractor.extract(req),
            Self::Forwarded => SmartIpKeyExtractor.extract(req),
        }
    }
}

pub type RateLimitLayer = GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, Body>;

fn build(behind_proxy: bool, per_second: u64, burst: u32) -> Option<RateLimitLayer> {
    let key_extractor = if behind_proxy {
        ClientIpKeyExtractor::Forwarded
    } else {
        ClientIpKeyExtractor::Peer
    };

    let config = GovernorConfigBuilder::default()
        .per_second(per_second)
        .burst_size(burst)
        .key_extractor(key_extractor)
        .finish()?;

    Some(GovernorLayer::new(Arc::new(config)))
}

/// Limiter for the public redirect path.
///
/// - **Rate**: 50 requests per second
/// - **Burst**: 200 requests
pub fn redirect_layer(behind_proxy: bool) -> Option<RateLimitLayer> {
    build(behind_proxy, 50, 200)
}

/// Limiter for the dashboard API.
///
/// - **Rate**: 5 requests per second
/// - **Burst**: 50 requests
pub fn api_layer(behind_proxy: bool) -> Option<RateLimitLayer> {
    build(behind_proxy, 5, 50)
}

/// Stricter limiter for credential endpoints.
///
/// - **Rate**: 1 request per second
/// - **Burst**: 10 requests
pub fn auth_layer(behind_proxy: bool) -> Option<RateLimitLayer> {
    build(behind_proxy, 1, 10)
}
