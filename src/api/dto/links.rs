//! DTOs for link management endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::application::services::CreateLink;
use crate::domain::entities::Link;

/// Request body for `POST /links`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLinkRequest {
    #[validate(length(min = 1, max = 2048))]
    pub original_url: String,

    #[validate(length(max = 100))]
    pub tag: Option<String>,

    /// Must be in the future. Omitted means the server default lifetime.
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<CreateLinkRequest> for CreateLink {
    fn from(req: CreateLinkRequest) -> Self {
        CreateLink {
            original_url: req.original_url,
            tag: req.tag,
            expires_at: req.expires_at,
        }
    }
}

/// A link as returned to the dashboard.
///
/// `clicks` is the display counter and may briefly lag the event count
/// reported by the stats endpoint.
#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub id: i64,
    pub original_url: String,
    pub short_code: String,
    pub short_url: String,
    pub clicks: i64,
    pub created_at: DateTime<Utc>,
    pub owner_id: i64,
    pub tag: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_expired: bool,
    pub expires_in_days: Option<i64>,
}

impl LinkResponse {
    pub fn from_link(link: Link, base_url: &str, now: DateTime<Utc>) -> Self {
        Self {
            is_expired: link.is_expired_at(now),
            expires_in_days: link.expires_in_days(now),
            short_url: format!("{}/{}", base_url, link.short_code),
            id: link.id,
            original_url: link.original_url,
            short_code: link.short_code,
            clicks: link.click_count,
            created_at: link.created_at,
            owner_id: link.owner_id,
            tag: link.tag,
            expires_at: link.expires_at,
        }
    }

    pub fn from_links(links: Vec<Link>, base_url: &str) -> Vec<Self> {
        let now = Utc::now();
        links
            .into_iter()
            .map(|link| Self::from_link(link, base_url, now))
            .collect()
    }
}

/// Query for `PUT /links/{id}/extend`.
#[derive(Debug, Deserialize)]
pub struct ExtendQuery {
    pub days: i64,
}
