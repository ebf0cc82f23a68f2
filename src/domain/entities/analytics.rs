//! Value types shared by the aggregation engine and its storage backends.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Calendar granularity for time-bucketed click counts. Buckets are aligned
/// in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    #[default]
    Day,
    Month,
    Year,
}

impl Interval {
    /// Field name accepted by PostgreSQL `date_trunc`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Day => "day",
            Interval::Month => "month",
            Interval::Year => "year",
        }
    }

    /// First calendar day of the bucket containing `date`.
    pub fn truncate_date(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Interval::Day => date,
            Interval::Month => date.with_day(1).unwrap_or(date),
            Interval::Year => date.with_ordinal(1).unwrap_or(date),
        }
    }

    /// Start instant of the bucket containing `ts`.
    pub fn bucket_start(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        self.truncate_date(ts.date_naive())
            .and_time(NaiveTime::MIN)
            .and_utc()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categorical dimension of a click event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Country,
    Referrer,
    Browser,
    Device,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Country,
        Dimension::Referrer,
        Dimension::Browser,
        Dimension::Device,
    ];

    /// Column name in the `clicks` table and key in the rollup table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Country => "country",
            Dimension::Referrer => "referrer",
            Dimension::Browser => "browser",
            Dimension::Device => "device",
        }
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "country" => Ok(Dimension::Country),
            "referrer" => Ok(Dimension::Referrer),
            "browser" => Ok(Dimension::Browser),
            "device" => Ok(Dimension::Device),
            other => Err(format!("unknown dimension '{other}'")),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of links an aggregate is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsScope {
    Link(i64),
    Owner(i64),
    All,
}

/// Optional half-open time window `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| ts >= from) && self.to.is_none_or(|to| ts < to)
    }

    /// Inclusive first and last UTC day that overlap the range.
    pub fn day_bounds(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        (
            self.from.map(|from| from.date_naive()),
            self.to
                .map(|to| (to - TimeDelta::nanoseconds(1)).date_naive()),
        )
    }

    /// True when every present bound falls on a UTC midnight, so whole-day
    /// rollups cover the range exactly.
    pub fn is_day_aligned(&self) -> bool {
        [self.from, self.to]
            .into_iter()
            .flatten()
            .all(|at| at.time() == NaiveTime::MIN)
    }

    /// Day-granular containment used by rollup reads: a day is included when
    /// any part of it overlaps the range.
    pub fn contains_day(&self, day: NaiveDate) -> bool {
        let (first, last) = self.day_bounds();
        first.is_none_or(|first| day >= first) && last.is_none_or(|last| day <= last)
    }
}

/// One sparse entry of a clicks-over-time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeBucket {
    pub bucket_start: DateTime<Utc>,
    pub count: i64,
}

/// A per-day rollup counter for one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollupRow {
    pub day: NaiveDate,
    pub category: String,
    pub clicks: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_bucket_start_is_calendar_aligned() {
        let ts = Utc.with_ymd_and_hms(2024, 7, 19, 23, 59, 59).unwrap();

        assert_eq!(
            Interval::Day.bucket_start(ts),
            Utc.with_ymd_and_hms(2024, 7, 19, 0, 0, 0).unwrap()
        );
        assert_eq!(
            Interval::Month.bucket_start(ts),
            Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            Interval::Year.bucket_start(ts),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_interval_deserializes_lowercase() {
        let interval: Interval = serde_json::from_str("\"month\"").unwrap();
        assert_eq!(interval, Interval::Month);
        assert!(serde_json::from_str::<Interval>("\"week\"").is_err());
    }

    #[test]
    fn test_dimension_from_str() {
        assert_eq!("device".parse::<Dimension>().unwrap(), Dimension::Device);
        assert!("os".parse::<Dimension>().is_err());
    }

    #[test]
    fn test_time_range_day_alignment() {
        let midnight = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let noon = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        assert!(TimeRange::default().is_day_aligned());
        assert!(TimeRange::new(Some(midnight), None).is_day_aligned());
        assert!(!TimeRange::new(Some(noon), None).is_day_aligned());
        assert!(!TimeRange::new(Some(midnight), Some(noon)).is_day_aligned());
        assert!(
            !TimeRange::new(Some(midnight + TimeDelta::nanoseconds(1)), None).is_day_aligned()
        );
    }

    #[test]
    fn test_time_range_is_half_open() {
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let range = TimeRange::new(Some(from), Some(to));

        assert!(range.contains(from));
        assert!(!range.contains(to));
        assert!(TimeRange::default().contains(to));
    }

    #[test]
    fn test_contains_day_excludes_day_starting_at_range_end() {
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();
        let range = TimeRange::new(Some(from), Some(to));

        assert!(range.contains_day(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        assert!(range.contains_day(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()));
        assert!(!range.contains_day(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()));
    }
}
