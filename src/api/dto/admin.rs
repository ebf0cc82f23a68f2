//! DTOs for superuser endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::services::SiteStats;
use crate::domain::entities::Account;

#[derive(Debug, Serialize)]
pub struct AdminStatsResponse {
    pub total_users: i64,
    pub total_links: i64,
    pub total_clicks: i64,
}

impl From<SiteStats> for AdminStatsResponse {
    fn from(stats: SiteStats) -> Self {
        Self {
            total_users: stats.total_users,
            total_links: stats.total_links,
            total_clicks: stats.total_clicks,
        }
    }
}

/// An account without its password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for UserResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            is_active: account.is_active,
            is_superuser: account.is_superuser,
            is_verified: account.is_verified,
            created_at: account.created_at,
        }
    }
}

/// Request body for `PATCH /admin/users/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub is_active: bool,
}
