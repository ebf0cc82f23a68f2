//! DTOs for the contact form and its inbox.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::application::services::MAX_SUBMISSION_PAGE;
use crate::domain::entities::{ContactSubmission, NewContactSubmission};

/// Request body for `POST /contact-submissions`.
#[derive(Debug, Deserialize, Validate)]
pub struct ContactSubmissionRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,

    #[validate(length(max = 100))]
    #[serde(default)]
    pub last_name: String,

    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 1, max = 5000))]
    pub message: String,
}

impl From<ContactSubmissionRequest> for NewContactSubmission {
    fn from(req: ContactSubmissionRequest) -> Self {
        Self {
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            message: req.message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ContactSubmissionResponse {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl From<ContactSubmission> for ContactSubmissionResponse {
    fn from(s: ContactSubmission) -> Self {
        Self {
            id: s.id,
            first_name: s.first_name,
            last_name: s.last_name,
            email: s.email,
            message: s.message,
            created_at: s.created_at,
        }
    }
}

/// `?skip=&limit=` for `GET /contact-submissions`.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    MAX_SUBMISSION_PAGE
}
