//! Time-bucketed and categorical click aggregation.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::domain::entities::{AnalyticsScope, Dimension, Interval, TimeBucket, TimeRange};
use crate::domain::repositories::ClickRepository;
use crate::error::AppError;

/// Source used to answer aggregate queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregationMode {
    /// Group raw click events. Exact for any range.
    Scan,
    /// Fold per-day rollup counters. Ranges with a bound inside a day are
    /// answered from raw events.
    #[default]
    Rollup,
}

impl FromStr for AggregationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scan" => Ok(Self::Scan),
            "rollup" => Ok(Self::Rollup),
            other => Err(format!("unknown aggregation mode '{other}'")),
        }
    }
}

impl fmt::Display for AggregationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Scan => "scan",
            Self::Rollup => "rollup",
        })
    }
}

/// Answers dashboard aggregate queries.
#[async_trait]
pub trait Aggregator: Send + Sync {
    /// Sparse, ascending, UTC calendar-aligned counts.
    async fn clicks_over_time(
        &self,
        scope: AnalyticsScope,
        range: TimeRange,
        interval: Interval,
    ) -> Result<Vec<TimeBucket>, AppError>;

    /// Count per category of `dimension`. Unordered.
    async fn breakdown(
        &self,
        scope: AnalyticsScope,
        range: TimeRange,
        dimension: Dimension,
    ) -> Result<HashMap<String, i64>, AppError>;

    fn mode(&self) -> AggregationMode;
}

/// Builds the aggregator for `mode`.
pub fn aggregator_for(mode: AggregationMode, clicks: Arc<dyn ClickRepository>) -> Arc<dyn Aggregator> {
    match mode {
        AggregationMode::Scan => Arc::new(ScanAggregator::new(clicks)),
        AggregationMode::Rollup => Arc::new(RollupAggregator::new(clicks)),
    }
}

pub struct ScanAggregator {
    clicks: Arc<dyn ClickRepository>,
}

impl ScanAggregator {
    pub fn new(clicks: Arc<dyn ClickRepository>) -> Self {
        Self { clicks }
    }
}

#[async_trait]
impl Aggregator for ScanAggregator {
    async fn clicks_over_time(
        &self,
        scope: AnalyticsScope,
        range: TimeRange,
        interval: Interval,
    ) -> Result<Vec<TimeBucket>, AppError> {
        self.clicks.count_by_bucket(scope, range, interval).await
    }

    async fn breakdown(
        &self,
        scope: AnalyticsScope,
        range: TimeRange,
        dimension: Dimension,
    ) -> Result<HashMap<String, i64>, AppError> {
        self.clicks.count_by_category(scope, range, dimension).await
    }

    fn mode(&self) -> AggregationMode {
        AggregationMode::Scan
    }
}

/// Reads daily rollups when the range is made of whole UTC days and falls
/// back to a scan otherwise.
pub struct RollupAggregator {
    clicks: Arc<dyn ClickRepository>,
}

impl RollupAggregator {
    pub fn new(clicks: Arc<dyn ClickRepository>) -> Self {
        Self { clicks }
    }
}

#[async_trait]
impl Aggregator for RollupAggregator {
    async fn clicks_over_time(
        &self,
        scope: AnalyticsScope,
        range: TimeRange,
        interval: Interval,
    ) -> Result<Vec<TimeBucket>, AppError> {
        if !range.is_day_aligned() {
            return self.clicks.count_by_bucket(scope, range, interval).await;
        }
        let rows = self.clicks.rollup_rows(scope, range, None).await?;

        let mut buckets: BTreeMap<NaiveDate, i64> = BTreeMap::new();
        for row in rows {
            *buckets.entry(interval.truncate_date(row.day)).or_default() += row.clicks;
        }

        Ok(buckets
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(day, count)| TimeBucket {
                bucket_start: day.and_time(NaiveTime::MIN).and_utc(),
                count,
            })
            .collect())
    }

    async fn breakdown(
        &self,
        scope: AnalyticsScope,
        range: TimeRange,
        dimension: Dimension,
    ) -> Result<HashMap<String, i64>, AppError> {
        if !range.is_day_aligned() {
            return self.clicks.count_by_category(scope, range, dimension).await;
        }
        let rows = self.clicks.rollup_rows(scope, range, Some(dimension)).await?;

        let mut counts: HashMap<String, i64> = HashMap::new();
        for row in rows {
            *counts.entry(row.category).or_default() += row.clicks;
        }
        counts.retain(|_, count| *count > 0);
        Ok(counts)
    }

    fn mode(&self) -> AggregationMode {
        AggregationMode::Rollup
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{NewClick, NewLink, RollupRow};
    use crate::domain::repositories::{LinkRepository, MockClickRepository};
    use crate::infrastructure::persistence::MemoryStore;
    use chrono::{DateTime, TimeZone, Utc};

    fn click(link_id: i64, at: DateTime<Utc>, browser: &str) -> NewClick {
        NewClick {
            link_id,
            short_code: String::new(),
            occurred_at: at,
            country: "US".to_string(),
            referrer: "Direct".to_string(),
            browser: browser.to_string(),
            device: "Desktop".to_string(),
            ip_address: None,
        }
    }

    async fn seeded_store() -> (Arc<MemoryStore>, i64, i64) {
        let store = Arc::new(MemoryStore::new());
        let mut ids = Vec::new();
        for (code, owner) in [("aaaaaaa", 1), ("bbbbbbb", 2)] {
            let link = store
                .insert_if_absent(NewLink {
                    short_code: code.to_string(),
                    original_url: "https://example.com".to_string(),
                    owner_id: owner,
                    tag: None,
                    expires_at: None,
                })
                .await
                .unwrap()
                .unwrap();
            ids.push(link.id);
        }

        let times = [
            Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 1, 13, 0, 0).unwrap(),
        ];
        let mut batch = Vec::new();
        for (i, at) in times.iter().enumerate() {
            let browser = if i % 2 == 0 { "Chrome" } else { "Firefox" };
            batch.push(click(ids[0], *at, browser));
        }
        batch.push(click(ids[1], times[2], "Safari"));
        store.insert_batch(&batch).await.unwrap();

        (store, ids[0], ids[1])
    }

    #[tokio::test]
    async fn test_bucket_sums_equal_total_for_every_interval() {
        let (store, link_a, _) = seeded_store().await;
        let total = ClickRepository::count(
            store.as_ref(),
            AnalyticsScope::Link(link_a),
            TimeRange::default(),
        )
        .await
        .unwrap();

        for mode in [AggregationMode::Scan, AggregationMode::Rollup] {
            let aggregator = aggregator_for(mode, store.clone());
            for interval in [Interval::Day, Interval::Month, Interval::Year] {
                let buckets = aggregator
                    .clicks_over_time(AnalyticsScope::Link(link_a), TimeRange::default(), interval)
                    .await
                    .unwrap();

                let sum: i64 = buckets.iter().map(|b| b.count).sum();
                assert_eq!(sum, total, "{mode} {interval}");
                assert!(buckets.windows(2).all(|w| w[0].bucket_start < w[1].bucket_start));
            }
        }
    }

    #[tokio::test]
    async fn test_buckets_are_calendar_aligned() {
        let (store, link_a, _) = seeded_store().await;
        let aggregator = aggregator_for(AggregationMode::Rollup, store);

        let months = aggregator
            .clicks_over_time(AnalyticsScope::Link(link_a), TimeRange::default(), Interval::Month)
            .await
            .unwrap();

        assert_eq!(
            months,
            vec![
                TimeBucket {
                    bucket_start: Utc.with_ymd_and_hms(2023, 12, 1, 0, 0, 0).unwrap(),
                    count: 1
                },
                TimeBucket {
                    bucket_start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                    count: 2
                },
                TimeBucket {
                    bucket_start: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
                    count: 2
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_scan_and_rollup_agree() {
        let (store, _, _) = seeded_store().await;
        let scan = aggregator_for(AggregationMode::Scan, store.clone());
        let rollup = aggregator_for(AggregationMode::Rollup, store);

        for dimension in Dimension::ALL {
            for scope in [AnalyticsScope::Owner(1), AnalyticsScope::Owner(2), AnalyticsScope::All] {
                assert_eq!(
                    scan.breakdown(scope, TimeRange::default(), dimension).await.unwrap(),
                    rollup.breakdown(scope, TimeRange::default(), dimension).await.unwrap(),
                    "{dimension} {scope:?}"
                );
            }
        }
    }

    #[tokio::test]
    async fn test_breakdown_is_owner_scoped() {
        let (store, _, _) = seeded_store().await;
        let aggregator = aggregator_for(AggregationMode::Scan, store);

        let browsers = aggregator
            .breakdown(AnalyticsScope::Owner(1), TimeRange::default(), Dimension::Browser)
            .await
            .unwrap();

        assert_eq!(browsers.get("Chrome"), Some(&3));
        assert_eq!(browsers.get("Firefox"), Some(&2));
        assert!(!browsers.contains_key("Safari"));
    }

    #[tokio::test]
    async fn test_rollup_folds_rows_into_year_buckets() {
        let mut clicks = MockClickRepository::new();
        clicks.expect_rollup_rows().returning(|_, _, _| {
            Ok(vec![
                RollupRow {
                    day: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                    category: String::new(),
                    clicks: 4,
                },
                RollupRow {
                    day: NaiveDate::from_ymd_opt(2024, 11, 30).unwrap(),
                    category: String::new(),
                    clicks: 6,
                },
            ])
        });
        let aggregator = RollupAggregator::new(Arc::new(clicks));

        let years = aggregator
            .clicks_over_time(AnalyticsScope::All, TimeRange::default(), Interval::Year)
            .await
            .unwrap();

        assert_eq!(years.len(), 1);
        assert_eq!(years[0].count, 10);
    }

    #[tokio::test]
    async fn test_partial_day_range_is_exact_in_both_modes() {
        let store = Arc::new(MemoryStore::new());
        let link = store
            .insert_if_absent(NewLink {
                short_code: "partial".to_string(),
                original_url: "https://example.com".to_string(),
                owner_id: 1,
                tag: None,
                expires_at: None,
            })
            .await
            .unwrap()
            .unwrap();
        let at = |h| Utc.with_ymd_and_hms(2024, 5, 1, h, 0, 0).unwrap();
        store
            .insert_batch(&[
                click(link.id, at(8), "Chrome"),
                click(link.id, at(10), "Chrome"),
                click(link.id, at(14), "Firefox"),
            ])
            .await
            .unwrap();

        let scope = AnalyticsScope::Owner(1);
        for range in [
            TimeRange::new(Some(at(12)), None),
            TimeRange::new(None, Some(at(12))),
            TimeRange::new(Some(at(9)), Some(at(15))),
        ] {
            let expected = ClickRepository::count(store.as_ref(), scope, range).await.unwrap();
            for mode in [AggregationMode::Scan, AggregationMode::Rollup] {
                let aggregator = aggregator_for(mode, store.clone());
                for interval in [Interval::Day, Interval::Month, Interval::Year] {
                    let series = aggregator.clicks_over_time(scope, range, interval).await.unwrap();
                    assert_eq!(
                        series.iter().map(|b| b.count).sum::<i64>(),
                        expected,
                        "{mode} {interval} {range:?}"
                    );
                }
                let browsers = aggregator
                    .breakdown(scope, range, Dimension::Browser)
                    .await
                    .unwrap();
                assert_eq!(browsers.values().sum::<i64>(), expected, "{mode} {range:?}");
            }
        }
    }

    #[tokio::test]
    async fn test_rollup_scans_when_bound_is_not_midnight() {
        let mut clicks = MockClickRepository::new();
        clicks.expect_rollup_rows().never();
        clicks
            .expect_count_by_category()
            .times(1)
            .returning(|_, _, _| Ok(HashMap::from([("Chrome".to_string(), 1)])));
        let aggregator = RollupAggregator::new(Arc::new(clicks));

        let from = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let browsers = aggregator
            .breakdown(AnalyticsScope::All, TimeRange::new(Some(from), None), Dimension::Browser)
            .await
            .unwrap();

        assert_eq!(browsers.get("Chrome"), Some(&1));
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("scan".parse::<AggregationMode>().unwrap(), AggregationMode::Scan);
        assert_eq!(" Rollup ".parse::<AggregationMode>().unwrap(), AggregationMode::Rollup);
        assert!("cube".parse::<AggregationMode>().is_err());
    }
}
