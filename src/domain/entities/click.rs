//! Click entity representing a single recorded redirect.

use chrono::{DateTime, Utc};

/// Placeholder category for any dimension that could not be determined.
pub const UNKNOWN: &str = "Unknown";

/// A persisted click event.
///
/// Click events are append-only. They disappear only when their link is
/// deleted, and every aggregate is derived from them.
#[derive(Debug, Clone, PartialEq)]
pub struct Click {
    pub id: i64,
    pub link_id: i64,
    pub occurred_at: DateTime<Utc>,
    pub country: String,
    pub referrer: String,
    pub browser: String,
    pub device: String,
    pub ip_address: Option<String>,
}

/// A classified click ready to be written.
///
/// Produced by the click worker from a queued
/// [`crate::domain::click_event::ClickEvent`]; categorical fields are already
/// normalized and never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct NewClick {
    pub link_id: i64,
    pub short_code: String,
    pub occurred_at: DateTime<Utc>,
    pub country: String,
    pub referrer: String,
    pub browser: String,
    pub device: String,
    pub ip_address: Option<String>,
}
