//! Link entity representing a short code → destination mapping.

use chrono::{DateTime, Utc};

/// A shortened URL owned by an account.
///
/// `short_code` is globally unique and never changes after insertion.
/// `click_count` is a denormalized display counter; the authoritative count
/// is the number of stored click events.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id: i64,
    pub short_code: String,
    pub original_url: String,
    pub owner_id: i64,
    pub tag: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub click_count: i64,
}

impl Link {
    /// Returns true if the link has an expiry that is at or before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|e| now >= e)
    }

    /// Returns true if the link has passed its expiry time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Whole days remaining until expiry, clamped at zero.
    pub fn expires_in_days(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expires_at.map(|e| (e - now).num_days().max(0))
    }
}

/// Input data for inserting a new link.
#[derive(Debug, Clone)]
pub struct NewLink {
    pub short_code: String,
    pub original_url: String,
    pub owner_id: i64,
    pub tag: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}
