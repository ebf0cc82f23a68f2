//! Per-link statistics and owner-scoped dashboard analysis.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use crate::application::services::access_control::{Action, Resource, authorize};
use crate::application::services::aggregator::Aggregator;
use crate::domain::entities::{
    Account, AnalyticsScope, Dimension, Interval, TimeBucket, TimeRange,
};
use crate::domain::repositories::{ClickRepository, LinkRepository};
use crate::error::AppError;
use serde_json::json;

/// Statistics for a single link.
///
/// `total_clicks` is the number of stored click events, not the link's
/// display counter.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkStats {
    pub short_code: String,
    pub total_clicks: i64,
    pub tag: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_clicked_at: Option<DateTime<Utc>>,
    pub by_country: HashMap<String, i64>,
    pub by_referrer: HashMap<String, i64>,
    pub by_browser: HashMap<String, i64>,
    pub by_device: HashMap<String, i64>,
}

pub struct AnalyticsService {
    links: Arc<dyn LinkRepository>,
    clicks: Arc<dyn ClickRepository>,
    aggregator: Arc<dyn Aggregator>,
}

impl AnalyticsService {
    pub fn new(
        links: Arc<dyn LinkRepository>,
        clicks: Arc<dyn ClickRepository>,
        aggregator: Arc<dyn Aggregator>,
    ) -> Self {
        Self {
            links,
            clicks,
            aggregator,
        }
    }

    /// Full statistics for one link, visible to its owner and superusers.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the link does not exist
    /// - [`AppError::Forbidden`] if `actor` may not read it
    pub async fn link_stats(&self, actor: &Account, link_id: i64) -> Result<LinkStats, AppError> {
        let link = self.links.find_by_id(link_id).await?.ok_or_else(|| {
            AppError::not_found("Link not found", json!({ "link_id": link_id }))
        })?;
        authorize(actor, Action::ReadLink, Resource::Link(&link))?;

        let scope = AnalyticsScope::Link(link.id);
        let all_time = TimeRange::default();

        let total_clicks = self.clicks.count(scope, all_time).await?;
        let last_clicked_at = self.clicks.last_clicked_at(link.id).await?;
        let by_country = self.aggregator.breakdown(scope, all_time, Dimension::Country).await?;
        let by_referrer = self.aggregator.breakdown(scope, all_time, Dimension::Referrer).await?;
        let by_browser = self.aggregator.breakdown(scope, all_time, Dimension::Browser).await?;
        let by_device = self.aggregator.breakdown(scope, all_time, Dimension::Device).await?;

        Ok(LinkStats {
            short_code: link.short_code,
            total_clicks,
            tag: link.tag,
            created_at: link.created_at,
            last_clicked_at,
            by_country,
            by_referrer,
            by_browser,
            by_device,
        })
    }

    /// Clicks over time across every link `actor` owns.
    pub async fn clicks_over_time(
        &self,
        actor: &Account,
        interval: Interval,
        range: TimeRange,
    ) -> Result<Vec<TimeBucket>, AppError> {
        validate_range(range)?;
        self.aggregator
            .clicks_over_time(AnalyticsScope::Owner(actor.id), range, interval)
            .await
    }

    /// Category counts across every link `actor` owns.
    pub async fn breakdown(
        &self,
        actor: &Account,
        dimension: Dimension,
        range: TimeRange,
    ) -> Result<HashMap<String, i64>, AppError> {
        validate_range(range)?;
        self.aggregator
            .breakdown(AnalyticsScope::Owner(actor.id), range, dimension)
            .await
    }
}

fn validate_range(range: TimeRange) -> Result<(), AppError> {
    if let (Some(from), Some(to)) = (range.from, range.to)
        && from > to
    {
        return Err(AppError::bad_request(
            "'from' must not be after 'to'",
            json!({ "from": from, "to": to }),
        ));
    }
    Ok(())
}
