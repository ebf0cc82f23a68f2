//! Repository trait for contact form submissions.

use crate::domain::entities::{ContactSubmission, NewContactSubmission};
use crate::error::AppError;
use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn create(&self, submission: NewContactSubmission) -> Result<ContactSubmission, AppError>;

    /// Newest first, skipping `skip` and returning at most `limit`.
    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<ContactSubmission>, AppError>;

    /// Removes a submission and returns it, or `Ok(None)` if no submission
    /// has this id.
    async fn delete(&self, id: i64) -> Result<Option<ContactSubmission>, AppError>;
}
