//! PostgreSQL implementation of account repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{Account, NewAccount};
use crate::domain::repositories::AccountRepository;
use crate::error::AppError;

const ACCOUNT_COLUMNS: &str =
    "id, email, password_hash, is_active, is_superuser, is_verified, created_at";

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: i64,
    email: String,
    password_hash: String,
    is_active: bool,
    is_superuser: bool,
    is_verified: bool,
    created_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(r: AccountRow) -> Self {
        Account {
            id: r.id,
            email: r.email,
            password_hash: r.password_hash,
            is_active: r.is_active,
            is_superuser: r.is_superuser,
            is_verified: r.is_verified,
            created_at: r.created_at,
        }
    }
}

/// PostgreSQL repository for accounts and verification tokens.
pub struct PgAccountRepository {
    pool: Arc<PgPool>,
}

impl PgAccountRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn create(&self, new_account: NewAccount) -> Result<Account, AppError> {
        // Unique violations surface as Conflict through From<sqlx::Error>.
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r#"
            INSERT INTO accounts (email, password_hash, is_superuser)
            VALUES ($1, $2, $3)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(&new_account.email)
        .bind(&new_account.password_hash)
        .bind(new_account.is_superuser)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Account>, AppError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Account::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Account::from))
    }

    async fn list_all(&self) -> Result<Vec<Account>, AppError> {
        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY created_at, id"
        ))
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(Account::from).collect())
    }

    async fn count(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count)
    }

    async fn set_active(&self, id: i64, is_active: bool) -> Result<Option<Account>, AppError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "UPDATE accounts SET is_active = $2 WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(id)
        .bind(is_active)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Account::from))
    }

    async fn mark_verified(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE accounts SET is_verified = TRUE WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn store_verification_token(
        &self,
        account_id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO verification_tokens (token_hash, account_id, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(token_hash)
        .bind(account_id)
        .bind(expires_at)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn consume_verification_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<i64>, AppError> {
        let row: Option<(i64, DateTime<Utc>)> = sqlx::query_as(
            "DELETE FROM verification_tokens WHERE token_hash = $1 RETURNING account_id, expires_at",
        )
        .bind(token_hash)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.filter(|(_, expires_at)| now < *expires_at).map(|(id, _)| id))
    }
}
