//! Click event model for asynchronous click tracking.

use chrono::{DateTime, Utc};
use std::net::IpAddr;

/// Raw request metadata captured on the redirect path.
///
/// Nothing here is parsed yet: user-agent and referrer classification happen
/// in the click worker so the redirect response is not delayed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestMetadata {
    pub ip: Option<IpAddr>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    /// Country code supplied by an upstream proxy or CDN, if any.
    pub country_hint: Option<String>,
}

/// An in-memory click event passed from the redirect handler to the
/// background worker through the bounded ingest channel.
///
/// `occurred_at` is assigned when the event is admitted to the queue.
#[derive(Debug, Clone)]
pub struct ClickEvent {
    pub link_id: i64,
    pub short_code: String,
    pub occurred_at: DateTime<Utc>,
    pub metadata: RequestMetadata,
}

impl ClickEvent {
    pub fn new(link_id: i64, short_code: String, metadata: RequestMetadata) -> Self {
        Self {
            link_id,
            short_code,
            occurred_at: Utc::now(),
            metadata,
        }
    }
}
