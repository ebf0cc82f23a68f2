//! DTOs for time-series and breakdown queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{Interval, TimeBucket, TimeRange};

/// Query for `clicks-over-time` and `user-registration-stats`.
#[derive(Debug, Default, Deserialize)]
pub struct SeriesQuery {
    #[serde(default)]
    pub interval: Interval,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl SeriesQuery {
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.from, self.to)
    }
}

/// Query for breakdown endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl RangeQuery {
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.from, self.to)
    }
}

/// One sparse point of a series. `date` is the bucket start as `YYYY-MM-DD`.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct SeriesPoint {
    pub date: String,
    pub count: i64,
}

impl From<TimeBucket> for SeriesPoint {
    fn from(bucket: TimeBucket) -> Self {
        Self {
            date: bucket.bucket_start.format("%Y-%m-%d").to_string(),
            count: bucket.count,
        }
    }
}

pub fn series(buckets: Vec<TimeBucket>) -> Vec<SeriesPoint> {
    buckets.into_iter().map(SeriesPoint::from).collect()
}
