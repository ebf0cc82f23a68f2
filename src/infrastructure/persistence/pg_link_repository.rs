//! PostgreSQL implementation of link repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{Link, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

const LINK_COLUMNS: &str =
    "id, short_code, original_url, owner_id, tag, created_at, expires_at, click_count";

#[derive(sqlx::FromRow)]
struct LinkRow {
    id: i64,
    short_code: String,
    original_url: String,
    owner_id: i64,
    tag: Option<String>,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    click_count: i64,
}

impl From<LinkRow> for Link {
    fn from(r: LinkRow) -> Self {
        Link {
            id: r.id,
            short_code: r.short_code,
            original_url: r.original_url,
            owner_id: r.owner_id,
            tag: r.tag,
            created_at: r.created_at,
            expires_at: r.expires_at,
            click_count: r.click_count,
        }
    }
}

/// PostgreSQL repository for link storage and retrieval.
///
/// All statements are parameterized.
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
}

impl PgLinkRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn insert_if_absent(&self, new_link: NewLink) -> Result<Option<Link>, AppError> {
        let row = sqlx::query_as::<_, LinkRow>(&format!(
            r#"
            INSERT INTO links (short_code, original_url, owner_id, tag, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (short_code) DO NOTHING
            RETURNING {LINK_COLUMNS}
            "#
        ))
        .bind(&new_link.short_code)
        .bind(&new_link.original_url)
        .bind(new_link.owner_id)
        .bind(&new_link.tag)
        .bind(new_link.expires_at)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Link::from))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Link>, AppError> {
        let row = sqlx::query_as::<_, LinkRow>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Link::from))
    }

    async fn find_by_code(&self, short_code: &str) -> Result<Option<Link>, AppError> {
        let row = sqlx::query_as::<_, LinkRow>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE short_code = $1"
        ))
        .bind(short_code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Link::from))
    }

    async fn list_for_owner(&self, owner_id: i64) -> Result<Vec<Link>, AppError> {
        let rows = sqlx::query_as::<_, LinkRow>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE owner_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(owner_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(Link::from).collect())
    }

    async fn list_all(&self) -> Result<Vec<Link>, AppError> {
        let rows = sqlx::query_as::<_, LinkRow>(&format!(
            "SELECT {LINK_COLUMNS} FROM links ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(Link::from).collect())
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<Link>, AppError> {
        let rows = sqlx::query_as::<_, LinkRow>(&format!(
            r#"
            SELECT {LINK_COLUMNS} FROM links
            WHERE expires_at IS NOT NULL AND expires_at <= $1
            ORDER BY expires_at DESC, id DESC
            "#
        ))
        .bind(now)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(Link::from).collect())
    }

    async fn update_expiration(
        &self,
        id: i64,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Link>, AppError> {
        let row = sqlx::query_as::<_, LinkRow>(&format!(
            "UPDATE links SET expires_at = $2 WHERE id = $1 RETURNING {LINK_COLUMNS}"
        ))
        .bind(id)
        .bind(expires_at)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Link::from))
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM links WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM links")
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }

    async fn increment_clicks(&self, short_code: &str, by: i64) -> Result<(), AppError> {
        sqlx::query("UPDATE links SET click_count = click_count + $2 WHERE short_code = $1")
            .bind(short_code)
            .bind(by)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn reconcile_click_counts(&self) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE links l
            SET click_count = c.actual
            FROM (
                SELECT l2.id, COUNT(c2.id) AS actual
                FROM links l2
                LEFT JOIN clicks c2 ON c2.link_id = l2.id
                GROUP BY l2.id
            ) c
            WHERE l.id = c.id AND l.click_count <> c.actual
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected())
    }
}
