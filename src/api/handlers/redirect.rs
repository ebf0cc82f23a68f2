//! Handler for short URL redirect.

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};

use crate::api::extract::ClientMetadata;
use crate::error::AppError;
use crate::state::AppState;

/// Redirects a short code to its original URL.
///
/// # Endpoint
///
/// `GET /{code}`
///
/// # Request Flow
///
/// 1. Look the code up in the cache, then in the store on a miss
/// 2. Reject the link if its expiry has passed, even on a cache hit
/// 3. Offer a click event to the ingest queue without waiting
/// 4. Return `302 Found` with `Location` set to the original URL
///
/// A full ingest queue drops the click; the redirect still succeeds.
///
/// # Errors
///
/// - `404 Not Found` for unknown codes and for lookups that fail or time out
/// - `410 Gone` for expired links
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
    ClientMetadata(metadata): ClientMetadata,
) -> Result<impl IntoResponse, AppError> {
    let location = state.redirect_service.redirect(&code, metadata).await?;

    Ok((StatusCode::FOUND, [(header::LOCATION, location)]))
}
