//! Account entity for dashboard users and administrators.

use chrono::{DateTime, Utc};

/// A registered user.
///
/// Superusers may read and mutate every link and account, except that they
/// can never deactivate or delete themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Input data for registering an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub is_superuser: bool,
}
