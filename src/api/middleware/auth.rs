//! Bearer token authentication middleware.

use axum::{
    extract::{FromRequestParts, Request, State},
    middleware::Next,
    response::Response,
};
use axum_auth::AuthBearer;

use crate::{error::AppError, state::AppState};

/// Authenticates requests using the JWT in the `Authorization` header.
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// On success the active [`crate::domain::entities::Account`] is inserted
/// into request extensions, where handlers read it through
/// [`crate::api::extract::CurrentUser`].
///
/// # Errors
///
/// Returns `401 Unauthorized` with `WWW-Authenticate: Bearer` if the header
/// is missing, the token is invalid or expired, or the account is missing
/// or inactive.
pub async fn layer(
    State(st): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    let AuthBearer(token) = AuthBearer::from_request_parts(&mut parts, &())
        .await
        .map_err(|_| {
            AppError::unauthorized(
                "Unauthorized",
                serde_json::json!({"reason": "Authorization header is missing or invalid"}),
            )
        })?;

    let account = st.auth_service.authenticate(&token).await?;
    parts.extensions.insert(account);

    Ok(next.run(Request::from_parts(parts, body)).await)
}
