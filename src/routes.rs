//! Top-level router.
//!
//! # Route Structure
//!
//! - `GET  /{code}` - Short link redirect (public)
//! - `GET  /health` - Storage, cache and click queue status (public)
//! - `/auth/*`      - Registration and login (public)
//! - `POST /contact-submissions` - Contact form (public)
//! - everything else in [`crate::api::routes::protected_routes`] (Bearer token)
//!
//! # Middleware
//!
//! - **Tracing** - request spans with status and latency
//! - **Rate limiting** - per-IP token bucket, when enabled
//! - **Authentication** - Bearer JWT on the dashboard API
//! - **Path normalization** - trailing slashes are trimmed

use axum::routing::get;
use axum::{Router, middleware};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

use crate::api;
use crate::api::handlers::{health_handler, redirect_handler};
use crate::api::middleware::{auth, rate_limit, tracing};
use crate::state::AppState;

/// Options affecting router composition.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouterOptions {
    /// Rate limit keys come from forwarding headers rather than the peer.
    pub behind_proxy: bool,
    pub rate_limit: bool,
}

/// Constructs the application router with all routes and middleware.
///
/// The static `/links`, `/admin`, `/analysis`, `/auth`, `/health` and
/// `/contact-submissions` prefixes take precedence over `/{code}`; generated
/// codes never use those words.
pub fn app_router(state: AppState, options: RouterOptions) -> NormalizePath<Router> {
    let mut api_router = api::routes::protected_routes()
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::layer));
    let mut auth_router = api::routes::auth_routes().merge(api::routes::contact_routes());
    let mut redirect_router = Router::new().route("/{code}", get(redirect_handler));

    if options.rate_limit {
        if let Some(layer) = rate_limit::api_layer(options.behind_proxy) {
            api_router = api_router.layer(layer);
        }
        if let Some(layer) = rate_limit::auth_layer(options.behind_proxy) {
            auth_router = auth_router.layer(layer);
        }
        if let Some(layer) = rate_limit::redirect_layer(options.behind_proxy) {
            redirect_router = redirect_router.layer(layer);
        }
    }

    let router = Router::new()
        .route("/health", get(health_handler))
        .merge(auth_router)
        .merge(api_router)
        .merge(redirect_router)
        .with_state(state)
        .layer(tracing::layer());

    NormalizePathLayer::trim_trailing_slash().layer(router)
}
