//! Registration, login and email verification.

use axum::{
    Form, Json,
    extract::{Query, State},
    http::StatusCode,
};
use validator::Validate;

use crate::api::dto::admin::UserResponse;
use crate::api::dto::auth::{LoginForm, RegisterRequest, VerifyEmailQuery};
use crate::api::extract::CurrentUser;
use crate::application::services::AccessToken;
use crate::error::AppError;
use crate::state::AppState;

/// Creates an account.
///
/// # Endpoint
///
/// `POST /auth/register` with `{"email": "...", "password": "..."}`
///
/// A verification token is issued on success; the account can log in
/// before verifying.
///
/// # Errors
///
/// - `400 Bad Request` for an invalid email or a password outside 8..=72
/// - `409 Conflict` if the email is already registered
pub async fn register_handler(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    payload.validate()?;

    let registration = state
        .auth_service
        .register(&payload.email, &payload.password)
        .await?;

    Ok((StatusCode::CREATED, Json(registration.account.into())))
}

/// Exchanges credentials for a bearer token.
///
/// # Endpoint
///
/// `POST /auth/token` (form: `username`, `password`)
///
/// # Response
///
/// ```json
/// { "access_token": "eyJ...", "token_type": "bearer" }
/// ```
///
/// # Errors
///
/// `401 Unauthorized` for wrong credentials and inactive accounts.
pub async fn token_handler(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<AccessToken>, AppError> {
    let token = state
        .auth_service
        .login(&form.username, &form.password)
        .await?;
    Ok(Json(token))
}

/// `GET /auth/verify-email?token=...`
pub async fn verify_email_handler(
    State(state): State<AppState>,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<Json<UserResponse>, AppError> {
    let account = state.auth_service.verify_email(&query.token).await?;
    Ok(Json(account.into()))
}

/// `GET /auth/me`: the authenticated account.
pub async fn me_handler(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(user.into())
}
