//! Repository trait for click events and rollup counters.

use crate::domain::entities::{
    AnalyticsScope, Dimension, Interval, NewClick, RollupRow, TimeBucket, TimeRange,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Repository interface for click tracking.
///
/// Raw click events are authoritative. The per-day rollup table is a cache
/// maintained in the same transaction as the raw insert and can always be
/// rebuilt from the events with [`ClickRepository::rebuild_rollups`].
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgClickRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::MemoryStore`] - In-process implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClickRepository: Send + Sync {
    /// Persists a batch of clicks and their rollup increments atomically.
    ///
    /// Clicks whose link no longer exists are skipped.
    ///
    /// # Returns
    ///
    /// The number of clicks actually written.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage errors; in that case nothing
    /// from the batch was written and the caller may retry it whole.
    async fn insert_batch(&self, clicks: &[NewClick]) -> Result<u64, AppError>;

    /// Counts raw click events in scope.
    async fn count(&self, scope: AnalyticsScope, range: TimeRange) -> Result<i64, AppError>;

    async fn last_clicked_at(&self, link_id: i64) -> Result<Option<DateTime<Utc>>, AppError>;

    /// Groups raw events by UTC calendar bucket. Sparse, ascending.
    async fn count_by_bucket(
        &self,
        scope: AnalyticsScope,
        range: TimeRange,
        interval: Interval,
    ) -> Result<Vec<TimeBucket>, AppError>;

    /// Groups raw events by category of `dimension`.
    async fn count_by_category(
        &self,
        scope: AnalyticsScope,
        range: TimeRange,
        dimension: Dimension,
    ) -> Result<HashMap<String, i64>, AppError>;

    /// Reads per-day rollup rows. `dimension = None` selects the daily total
    /// counters, whose category is empty.
    async fn rollup_rows(
        &self,
        scope: AnalyticsScope,
        range: TimeRange,
        dimension: Option<Dimension>,
    ) -> Result<Vec<RollupRow>, AppError>;

    /// Discards all rollup rows and replays them from raw events.
    ///
    /// Returns the number of rollup rows written.
    async fn rebuild_rollups(&self) -> Result<u64, AppError>;
}
