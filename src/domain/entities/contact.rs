//! Messages left through the public contact form.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct ContactSubmission {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Input data for storing a contact form message.
#[derive(Debug, Clone)]
pub struct NewContactSubmission {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub message: String,
}
