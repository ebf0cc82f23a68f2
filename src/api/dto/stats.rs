//! DTO for per-link statistics.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::application::services::LinkStats;

/// Response of `GET /links/{id}/stats`.
///
/// Breakdown maps are unordered; sorting and top-N selection are left to
/// the client.
#[derive(Debug, Serialize)]
pub struct LinkStatsResponse {
    pub short_code: String,
    pub total_clicks: i64,
    pub tag: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_clicked_at: Option<DateTime<Utc>>,
    pub by_country: HashMap<String, i64>,
    pub by_referrer: HashMap<String, i64>,
    pub by_browser: HashMap<String, i64>,
    pub by_device: HashMap<String, i64>,
}

impl From<LinkStats> for LinkStatsResponse {
    fn from(stats: LinkStats) -> Self {
        Self {
            short_code: stats.short_code,
            total_clicks: stats.total_clicks,
            tag: stats.tag,
            created_at: stats.created_at,
            last_clicked_at: stats.last_clicked_at,
            by_country: stats.by_country,
            by_referrer: stats.by_referrer,
            by_browser: stats.by_browser,
            by_device: stats.by_device,
        }
    }
}
