//! Handlers for owner-scoped dashboard analysis.

use axum::{
    Json,
    extract::{Query, State},
};
use std::collections::HashMap;

use crate::api::dto::analysis::{RangeQuery, SeriesPoint, SeriesQuery, series};
use crate::api::extract::CurrentUser;
use crate::domain::entities::{Account, Dimension};
use crate::error::AppError;
use crate::state::AppState;

/// Clicks over time across the caller's links.
///
/// # Endpoint
///
/// `GET /analysis/clicks-over-time?interval=day|month|year&from=..&to=..`
///
/// `interval` defaults to `day`. `from` and `to` are optional RFC 3339
/// instants; `from` is inclusive and `to` exclusive.
///
/// # Response
///
/// Sparse, ascending by date:
///
/// ```json
/// [ { "date": "2024-05-01", "count": 4 }, { "date": "2024-05-03", "count": 1 } ]
/// ```
pub async fn clicks_over_time_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<SeriesQuery>,
) -> Result<Json<Vec<SeriesPoint>>, AppError> {
    let buckets = state
        .analytics_service
        .clicks_over_time(&user, query.interval, query.range())
        .await?;
    Ok(Json(series(buckets)))
}

async fn breakdown(
    state: &AppState,
    user: &Account,
    dimension: Dimension,
    query: &RangeQuery,
) -> Result<Json<HashMap<String, i64>>, AppError> {
    let counts = state
        .analytics_service
        .breakdown(user, dimension, query.range())
        .await?;
    Ok(Json(counts))
}

/// `GET /analysis/device-breakdown`
pub async fn device_breakdown_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<RangeQuery>,
) -> Result<Json<HashMap<String, i64>>, AppError> {
    breakdown(&state, &user, Dimension::Device, &query).await
}

/// `GET /analysis/browser-breakdown`
pub async fn browser_breakdown_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<RangeQuery>,
) -> Result<Json<HashMap<String, i64>>, AppError> {
    breakdown(&state, &user, Dimension::Browser, &query).await
}

/// `GET /analysis/referrer-breakdown`
pub async fn referrer_breakdown_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<RangeQuery>,
) -> Result<Json<HashMap<String, i64>>, AppError> {
    breakdown(&state, &user, Dimension::Referrer, &query).await
}

/// `GET /analysis/country-breakdown`
pub async fn country_breakdown_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<RangeQuery>,
) -> Result<Json<HashMap<String, i64>>, AppError> {
    breakdown(&state, &user, Dimension::Country, &query).await
}
