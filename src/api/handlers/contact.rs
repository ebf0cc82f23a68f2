//! Contact form endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use validator::Validate;

use crate::api::dto::contact::{ContactSubmissionRequest, ContactSubmissionResponse, PageQuery};
use crate::api::extract::CurrentUser;
use crate::error::AppError;
use crate::state::AppState;

/// Stores a message from the public contact form.
///
/// # Endpoint
///
/// `POST /contact-submissions`, no token required
///
/// # Errors
///
/// - `400 Bad Request` for a missing name or message, or a malformed email
pub async fn submit_handler(
    State(state): State<AppState>,
    Json(payload): Json<ContactSubmissionRequest>,
) -> Result<(StatusCode, Json<ContactSubmissionResponse>), AppError> {
    payload.validate()?;
    let stored = state.contact_service.submit(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(stored.into())))
}

/// `GET /contact-submissions?skip=0&limit=100`: superuser inbox, newest first.
pub async fn list_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<ContactSubmissionResponse>>, AppError> {
    let submissions = state
        .contact_service
        .list(&user, page.skip, page.limit)
        .await?;
    Ok(Json(
        submissions
            .into_iter()
            .map(ContactSubmissionResponse::from)
            .collect(),
    ))
}

/// `DELETE /contact-submissions/{id}`: returns the removed submission.
pub async fn delete_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<ContactSubmissionResponse>, AppError> {
    let removed = state.contact_service.delete(&user, id).await?;
    Ok(Json(removed.into()))
}
