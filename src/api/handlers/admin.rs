//! Superuser endpoints.
//!
//! Every handler here checks the caller server-side; regular accounts get
//! `403 Forbidden`.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::api::dto::admin::{AdminStatsResponse, UpdateUserRequest, UserResponse};
use crate::api::dto::analysis::{SeriesPoint, SeriesQuery, series};
use crate::api::dto::links::LinkResponse;
use crate::api::extract::CurrentUser;
use crate::error::AppError;
use crate::state::AppState;

/// `GET /admin/stats`: totals of users, links and stored clicks.
pub async fn site_stats_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<AdminStatsResponse>, AppError> {
    let stats = state.admin_service.site_stats(&user).await?;
    Ok(Json(stats.into()))
}

/// `GET /admin/users`
pub async fn list_users_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let accounts = state.admin_service.list_accounts(&user).await?;
    Ok(Json(accounts.into_iter().map(UserResponse::from).collect()))
}

/// `GET /admin/user-registration-stats?interval=day|month|year`
///
/// New accounts per bucket. `from` and `to` are ignored.
pub async fn registration_stats_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<SeriesQuery>,
) -> Result<Json<Vec<SeriesPoint>>, AppError> {
    let buckets = state
        .admin_service
        .registration_stats(&user, query.interval)
        .await?;
    Ok(Json(series(buckets)))
}

/// Activates or deactivates an account.
///
/// # Endpoint
///
/// `PATCH /admin/users/{id}` with `{"is_active": false}`
///
/// # Errors
///
/// - `403 Forbidden` when targeting the caller's own account
/// - `404 Not Found` for unknown ids
pub async fn update_user_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let account = state
        .admin_service
        .set_active(&user, id, payload.is_active)
        .await?;
    Ok(Json(account.into()))
}

/// Deletes an account with all its links and clicks.
///
/// # Endpoint
///
/// `DELETE /admin/users/{id}`
///
/// # Errors
///
/// - `403 Forbidden` when targeting the caller's own account
/// - `404 Not Found` for unknown ids
pub async fn delete_user_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.admin_service.delete_account(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /admin/links`: every link on the site.
pub async fn list_all_links_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<LinkResponse>>, AppError> {
    let links = state.link_service.list_all(&user).await?;
    Ok(Json(LinkResponse::from_links(
        links,
        &state.request_context.public_base_url,
    )))
}

/// `DELETE /admin/links/{id}`: removes any link regardless of owner.
pub async fn delete_any_link_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if !user.is_superuser {
        return Err(AppError::forbidden(
            "Superuser access required",
            serde_json::json!({ "link_id": id }),
        ));
    }
    state.link_service.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
