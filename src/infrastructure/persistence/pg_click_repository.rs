//! PostgreSQL implementation of click repository.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::entities::{
    AnalyticsScope, Dimension, Interval, NewClick, RollupRow, TimeBucket, TimeRange,
};
use crate::domain::repositories::ClickRepository;
use crate::error::AppError;

/// Shared predicate for scoped click reads. Binds: $1 link id, $2 owner id,
/// $3 from, $4 to.
const SCOPED_CLICKS: &str = r#"
    FROM clicks c
    JOIN links l ON l.id = c.link_id
    WHERE ($1::bigint IS NULL OR c.link_id = $1)
      AND ($2::bigint IS NULL OR l.owner_id = $2)
      AND ($3::timestamptz IS NULL OR c.occurred_at >= $3)
      AND ($4::timestamptz IS NULL OR c.occurred_at < $4)
"#;

/// Expands a click into its per-dimension rollup keys; `total` carries an
/// empty category.
const ROLLUP_KEYS: &str = r#"
    CROSS JOIN LATERAL (VALUES
        ('total', ''),
        ('country', src.country),
        ('referrer', src.referrer),
        ('browser', src.browser),
        ('device', src.device)
    ) AS k(dimension, category)
"#;

fn scope_params(scope: AnalyticsScope) -> (Option<i64>, Option<i64>) {
    match scope {
        AnalyticsScope::Link(id) => (Some(id), None),
        AnalyticsScope::Owner(owner) => (None, Some(owner)),
        AnalyticsScope::All => (None, None),
    }
}

/// PostgreSQL repository for click events and rollups.
pub struct PgClickRepository {
    pool: Arc<PgPool>,
}

impl PgClickRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClickRepository for PgClickRepository {
    async fn insert_batch(&self, clicks: &[NewClick]) -> Result<u64, AppError> {
        if clicks.is_empty() {
            return Ok(0);
        }

        let mut link_ids = Vec::with_capacity(clicks.len());
        let mut occurred = Vec::with_capacity(clicks.len());
        let mut countries = Vec::with_capacity(clicks.len());
        let mut referrers = Vec::with_capacity(clicks.len());
        let mut browsers = Vec::with_capacity(clicks.len());
        let mut devices = Vec::with_capacity(clicks.len());
        let mut ips: Vec<Option<String>> = Vec::with_capacity(clicks.len());
        for c in clicks {
            link_ids.push(c.link_id);
            occurred.push(c.occurred_at);
            countries.push(c.country.clone());
            referrers.push(c.referrer.clone());
            browsers.push(c.browser.clone());
            devices.push(c.device.clone());
            ips.push(c.ip_address.clone());
        }

        // One statement: the raw insert and the rollup upsert commit together.
        let written: i64 = sqlx::query_scalar(&format!(
            r#"
            WITH input AS (
                SELECT * FROM UNNEST(
                    $1::bigint[], $2::timestamptz[], $3::text[], $4::text[],
                    $5::text[], $6::text[], $7::text[]
                ) AS t(link_id, occurred_at, country, referrer, browser, device, ip_address)
            ),
            inserted AS (
                INSERT INTO clicks (link_id, occurred_at, country, referrer, browser, device, ip_address)
                SELECT i.link_id, i.occurred_at, i.country, i.referrer, i.browser, i.device, i.ip_address
                FROM input i
                WHERE EXISTS (SELECT 1 FROM links l WHERE l.id = i.link_id)
                RETURNING link_id, occurred_at, country, referrer, browser, device
            ),
            rolled AS (
                INSERT INTO click_rollups (link_id, day, dimension, category, clicks)
                SELECT src.link_id, (src.occurred_at AT TIME ZONE 'UTC')::date,
                       k.dimension, k.category, COUNT(*)
                FROM inserted src
                {ROLLUP_KEYS}
                GROUP BY 1, 2, 3, 4
                ON CONFLICT (link_id, day, dimension, category)
                DO UPDATE SET clicks = click_rollups.clicks + EXCLUDED.clicks
            )
            SELECT COUNT(*) FROM inserted
            "#
        ))
        .bind(&link_ids)
        .bind(&occurred)
        .bind(&countries)
        .bind(&referrers)
        .bind(&browsers)
        .bind(&devices)
        .bind(&ips)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(written as u64)
    }

    async fn count(&self, scope: AnalyticsScope, range: TimeRange) -> Result<i64, AppError> {
        let (link_id, owner_id) = scope_params(scope);
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) {SCOPED_CLICKS}"))
            .bind(link_id)
            .bind(owner_id)
            .bind(range.from)
            .bind(range.to)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count)
    }

    async fn last_clicked_at(&self, link_id: i64) -> Result<Option<DateTime<Utc>>, AppError> {
        let last: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT MAX(occurred_at) FROM clicks WHERE link_id = $1")
                .bind(link_id)
                .fetch_one(self.pool.as_ref())
                .await?;

        Ok(last)
    }

    async fn count_by_bucket(
        &self,
        scope: AnalyticsScope,
        range: TimeRange,
        interval: Interval,
    ) -> Result<Vec<TimeBucket>, AppError> {
        let (link_id, owner_id) = scope_params(scope);
        let rows: Vec<(DateTime<Utc>, i64)> = sqlx::query_as(&format!(
            r#"
            SELECT date_trunc($5, c.occurred_at, 'UTC') AS bucket_start, COUNT(*) AS count
            {SCOPED_CLICKS}
            GROUP BY 1
            ORDER BY 1
            "#
        ))
        .bind(link_id)
        .bind(owner_id)
        .bind(range.from)
        .bind(range.to)
        .bind(interval.as_str())
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(bucket_start, count)| TimeBucket {
                bucket_start,
                count,
            })
            .collect())
    }

    async fn count_by_category(
        &self,
        scope: AnalyticsScope,
        range: TimeRange,
        dimension: Dimension,
    ) -> Result<HashMap<String, i64>, AppError> {
        let (link_id, owner_id) = scope_params(scope);
        // Column name comes from a closed enum, never from input.
        let column = dimension.as_str();
        let rows: Vec<(String, i64)> = sqlx::query_as(&format!(
            "SELECT c.{column} AS category, COUNT(*) AS count {SCOPED_CLICKS} GROUP BY 1"
        ))
        .bind(link_id)
        .bind(owner_id)
        .bind(range.from)
        .bind(range.to)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().collect())
    }

    async fn rollup_rows(
        &self,
        scope: AnalyticsScope,
        range: TimeRange,
        dimension: Option<Dimension>,
    ) -> Result<Vec<RollupRow>, AppError> {
        let (link_id, owner_id) = scope_params(scope);
        let (first_day, last_day) = range.day_bounds();
        let dimension = dimension.map_or("total", |d| d.as_str());

        let rows: Vec<(NaiveDate, String, i64)> = sqlx::query_as(
            r#"
            SELECT r.day, r.category, SUM(r.clicks)::bigint AS clicks
            FROM click_rollups r
            JOIN links l ON l.id = r.link_id
            WHERE r.dimension = $1
              AND ($2::bigint IS NULL OR r.link_id = $2)
              AND ($3::bigint IS NULL OR l.owner_id = $3)
              AND ($4::date IS NULL OR r.day >= $4)
              AND ($5::date IS NULL OR r.day <= $5)
            GROUP BY r.day, r.category
            ORDER BY r.day, r.category
            "#,
        )
        .bind(dimension)
        .bind(link_id)
        .bind(owner_id)
        .bind(first_day)
        .bind(last_day)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(day, category, clicks)| RollupRow {
                day,
                category,
                clicks,
            })
            .collect())
    }

    async fn rebuild_rollups(&self) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM click_rollups")
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query(&format!(
            r#"
            INSERT INTO click_rollups (link_id, day, dimension, category, clicks)
            SELECT src.link_id, (src.occurred_at AT TIME ZONE 'UTC')::date,
                   k.dimension, k.category, COUNT(*)
            FROM clicks src
            {ROLLUP_KEYS}
            GROUP BY 1, 2, 3, 4
            "#
        ))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }
}
