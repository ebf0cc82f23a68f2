//! Repository trait for accounts and email verification tokens.

use crate::domain::entities::{Account, NewAccount};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Creates an account.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the email is already registered.
    async fn create(&self, new_account: NewAccount) -> Result<Account, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Account>, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError>;

    /// Lists every account, oldest first.
    async fn list_all(&self) -> Result<Vec<Account>, AppError>;

    async fn count(&self) -> Result<i64, AppError>;

    /// Returns `Ok(None)` if no account has this id.
    async fn set_active(&self, id: i64, is_active: bool) -> Result<Option<Account>, AppError>;

    async fn mark_verified(&self, id: i64) -> Result<bool, AppError>;

    /// Hard-deletes an account, cascading to its links and their clicks.
    async fn delete(&self, id: i64) -> Result<bool, AppError>;

    /// Stores the HMAC hash of a freshly issued verification token.
    async fn store_verification_token(
        &self,
        account_id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    /// Removes a verification token and returns its account id if it was
    /// present and not yet expired at `now`.
    async fn consume_verification_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<i64>, AppError>;
}
