//! PostgreSQL implementation of contact submission repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{ContactSubmission, NewContactSubmission};
use crate::domain::repositories::ContactRepository;
use crate::error::AppError;

const SUBMISSION_COLUMNS: &str = "id, first_name, last_name, email, message, created_at";

#[derive(sqlx::FromRow)]
struct SubmissionRow {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    message: String,
    created_at: DateTime<Utc>,
}

impl From<SubmissionRow> for ContactSubmission {
    fn from(r: SubmissionRow) -> Self {
        ContactSubmission {
            id: r.id,
            first_name: r.first_name,
            last_name: r.last_name,
            email: r.email,
            message: r.message,
            created_at: r.created_at,
        }
    }
}

pub struct PgContactRepository {
    pool: Arc<PgPool>,
}

impl PgContactRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContactRepository for PgContactRepository {
    async fn create(&self, submission: NewContactSubmission) -> Result<ContactSubmission, AppError> {
        let row = sqlx::query_as::<_, SubmissionRow>(&format!(
            r#"
            INSERT INTO contact_submissions (first_name, last_name, email, message)
            VALUES ($1, $2, $3, $4)
            RETURNING {SUBMISSION_COLUMNS}
            "#
        ))
        .bind(&submission.first_name)
        .bind(&submission.last_name)
        .bind(&submission.email)
        .bind(&submission.message)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row.into())
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<ContactSubmission>, AppError> {
        let rows = sqlx::query_as::<_, SubmissionRow>(&format!(
            r#"
            SELECT {SUBMISSION_COLUMNS} FROM contact_submissions
            ORDER BY created_at DESC, id DESC
            OFFSET $1 LIMIT $2
            "#
        ))
        .bind(skip)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(ContactSubmission::from).collect())
    }

    async fn delete(&self, id: i64) -> Result<Option<ContactSubmission>, AppError> {
        let row = sqlx::query_as::<_, SubmissionRow>(&format!(
            "DELETE FROM contact_submissions WHERE id = $1 RETURNING {SUBMISSION_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(ContactSubmission::from))
    }
}
