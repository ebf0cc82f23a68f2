//! Route tables, grouped by authentication requirement.

use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};

use crate::api::handlers::{admin, analysis, auth, contact, links};
use crate::state::AppState;

/// Credential endpoints, reachable without a token.
///
/// - `POST /auth/register`
/// - `POST /auth/token`
/// - `GET  /auth/verify-email?token=`
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/token", post(auth::token_handler))
        .route("/auth/verify-email", get(auth::verify_email_handler))
}

/// Public contact form intake.
///
/// - `POST /contact-submissions`
pub fn contact_routes() -> Router<AppState> {
    Router::new().route("/contact-submissions", post(contact::submit_handler))
}

/// Dashboard endpoints; each requires a Bearer token.
///
/// # Endpoints
///
/// - `GET    /auth/me`
/// - `POST   /links`, `GET /links`
/// - `GET    /links/active`, `GET /links/expired`
/// - `PUT    /links/{id}/extend?days=N`
/// - `DELETE /links/{id}`, `DELETE /links/users/me`
/// - `GET    /links/{id}/stats`
/// - `GET    /analysis/clicks-over-time`
/// - `GET    /analysis/{device,browser,referrer,country}-breakdown`
/// - `GET    /admin/stats`, `GET /admin/users`, `GET /admin/links`
/// - `GET    /admin/user-registration-stats`
/// - `PATCH  /admin/users/{id}`, `DELETE /admin/users/{id}`
/// - `DELETE /admin/links/{id}`
/// - `GET    /contact-submissions?skip&limit`
/// - `DELETE /contact-submissions/{id}`
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route(
            "/links",
            get(links::list_links_handler).post(links::create_link_handler),
        )
        .route("/links/active", get(links::active_links_handler))
        .route("/links/expired", get(links::expired_links_handler))
        .route("/links/{id}", delete(links::delete_link_handler))
        .route("/links/users/me", delete(links::delete_me_handler))
        .route("/links/{id}/extend", put(links::extend_link_handler))
        .route("/links/{id}/stats", get(links::link_stats_handler))
        .route(
            "/analysis/clicks-over-time",
            get(analysis::clicks_over_time_handler),
        )
        .route(
            "/analysis/device-breakdown",
            get(analysis::device_breakdown_handler),
        )
        .route(
            "/analysis/browser-breakdown",
            get(analysis::browser_breakdown_handler),
        )
        .route(
            "/analysis/referrer-breakdown",
            get(analysis::referrer_breakdown_handler),
        )
        .route(
            "/analysis/country-breakdown",
            get(analysis::country_breakdown_handler),
        )
        .route("/admin/stats", get(admin::site_stats_handler))
        .route("/admin/users", get(admin::list_users_handler))
        .route(
            "/admin/users/{id}",
            patch(admin::update_user_handler).delete(admin::delete_user_handler),
        )
        .route(
            "/admin/user-registration-stats",
            get(admin::registration_stats_handler),
        )
        .route("/admin/links", get(admin::list_all_links_handler))
        .route("/admin/links/{id}", delete(admin::delete_any_link_handler))
        .route("/contact-submissions", get(contact::list_handler))
        .route(
            "/contact-submissions/{id}",
            delete(contact::delete_handler),
        )
}
