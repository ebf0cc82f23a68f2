//! Repository trait for link data access.

use crate::domain::entities::{Link, NewLink};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Repository interface for short links.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgLinkRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::MemoryStore`] - In-process implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Inserts the link unless its short code is already taken.
    ///
    /// The uniqueness check and the insert are one atomic step, so two
    /// concurrent callers can never both succeed with the same code.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Link))` if inserted
    /// - `Ok(None)` if the code already exists
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage errors.
    async fn insert_if_absent(&self, new_link: NewLink) -> Result<Option<Link>, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Link>, AppError>;

    /// Finds a link by its short code, including expired links.
    async fn find_by_code(&self, short_code: &str) -> Result<Option<Link>, AppError>;

    /// Lists links owned by `owner_id`, newest first.
    async fn list_for_owner(&self, owner_id: i64) -> Result<Vec<Link>, AppError>;

    /// Lists every link, newest first.
    async fn list_all(&self) -> Result<Vec<Link>, AppError>;

    /// Lists links whose expiry is at or before `now`.
    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<Link>, AppError>;

    /// Replaces the expiration instant of a link.
    ///
    /// Returns `Ok(None)` if no link has this id.
    async fn update_expiration(
        &self,
        id: i64,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Link>, AppError>;

    /// Hard-deletes a link together with its click events and rollups.
    ///
    /// Returns `Ok(false)` if no link has this id.
    async fn delete(&self, id: i64) -> Result<bool, AppError>;

    async fn count(&self) -> Result<i64, AppError>;

    /// Cheapest round trip that proves the store answers.
    async fn ping(&self) -> Result<(), AppError>;

    /// Adds `by` to the denormalized click counter. Best-effort: unknown
    /// codes are ignored.
    async fn increment_clicks(&self, short_code: &str, by: i64) -> Result<(), AppError>;

    /// Resets every denormalized counter to its true click event count.
    ///
    /// Returns the number of links whose counter changed.
    async fn reconcile_click_counts(&self) -> Result<u64, AppError>;
}
