//! Handlers for link management endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use validator::Validate;

use crate::api::dto::links::{CreateLinkRequest, ExtendQuery, LinkResponse};
use crate::api::dto::stats::LinkStatsResponse;
use crate::api::extract::CurrentUser;
use crate::error::AppError;
use crate::state::AppState;

/// Creates a short link owned by the caller.
///
/// # Endpoint
///
/// `POST /links`
///
/// # Request Body
///
/// ```json
/// {
///   "original_url": "https://example.com/page",
///   "tag": "launch",
///   "expires_at": "2030-01-01T00:00:00Z"
/// }
/// ```
///
/// `tag` and `expires_at` are optional. Without `expires_at` the link gets
/// the server default lifetime.
///
/// # Errors
///
/// - `400 Bad Request` for an invalid URL, an oversized tag or a past expiry
/// - `500 Internal Server Error` if no free code could be generated
pub async fn create_link_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<LinkResponse>), AppError> {
    payload.validate()?;

    let link = state.link_service.create(&user, payload.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(LinkResponse::from_link(
            link,
            &state.request_context.public_base_url,
            Utc::now(),
        )),
    ))
}

/// `GET /links`: every link the caller owns, newest first.
pub async fn list_links_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<LinkResponse>>, AppError> {
    let links = state.link_service.list_for_owner(&user).await?;
    Ok(Json(LinkResponse::from_links(
        links,
        &state.request_context.public_base_url,
    )))
}

/// `GET /links/active`: owned links that have not expired.
pub async fn active_links_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<LinkResponse>>, AppError> {
    let links = state.link_service.list_active_for_owner(&user).await?;
    Ok(Json(LinkResponse::from_links(
        links,
        &state.request_context.public_base_url,
    )))
}

/// `GET /links/expired`: every expired link on the site. Superuser only.
pub async fn expired_links_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<LinkResponse>>, AppError> {
    let links = state.link_service.list_expired(&user).await?;
    Ok(Json(LinkResponse::from_links(
        links,
        &state.request_context.public_base_url,
    )))
}

/// Pushes a link's expiry `days` further out.
///
/// # Endpoint
///
/// `PUT /links/{id}/extend?days=N`
///
/// Counts from the current expiry or from now, whichever is later.
///
/// # Errors
///
/// - `400 Bad Request` unless `1 <= days <= 3650`
/// - `403 Forbidden` for non-superusers
/// - `404 Not Found` for unknown ids
pub async fn extend_link_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Query(query): Query<ExtendQuery>,
) -> Result<Json<LinkResponse>, AppError> {
    let link = state
        .link_service
        .extend_expiration(&user, id, query.days)
        .await?;

    Ok(Json(LinkResponse::from_link(
        link,
        &state.request_context.public_base_url,
        Utc::now(),
    )))
}

/// Deletes a link together with its click history.
///
/// # Endpoint
///
/// `DELETE /links/{id}`
///
/// The cached redirect is evicted, so the code stops resolving at once.
///
/// # Errors
///
/// - `403 Forbidden` unless the caller owns the link or is a superuser
/// - `404 Not Found` for unknown ids
pub async fn delete_link_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.link_service.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Closes the caller's account, removing every link it owns and their
/// clicks.
///
/// # Endpoint
///
/// `DELETE /links/users/me`
///
/// # Errors
///
/// - `403 Forbidden` for superusers
pub async fn delete_me_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, AppError> {
    state.admin_service.delete_self(&user).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Click statistics for one link.
///
/// # Endpoint
///
/// `GET /links/{id}/stats`
///
/// # Response
///
/// ```json
/// {
///   "short_code": "aZ3kP9q",
///   "total_clicks": 3,
///   "tag": null,
///   "created_at": "2024-05-01T10:00:00Z",
///   "last_clicked_at": "2024-06-10T10:00:00Z",
///   "by_country": { "US": 2, "DE": 1 },
///   "by_referrer": { "Direct": 3 },
///   "by_browser": { "Chrome": 3 },
///   "by_device": { "Desktop": 1, "Mobile": 2 }
/// }
/// ```
pub async fn link_stats_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<LinkStatsResponse>, AppError> {
    let stats = state.analytics_service.link_stats(&user, id).await?;
    Ok(Json(stats.into()))
}
