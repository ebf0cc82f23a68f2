//! # LinkShorty
//!
//! URL shortening with click analytics, built with Axum and PostgreSQL.
//!
//! ## Architecture
//!
//! - **Domain Layer** ([`domain`]) - entities, repository traits, click ingestion
//! - **Application Layer** ([`application`]) - link, redirect, analytics, admin and auth services
//! - **Infrastructure Layer** ([`infrastructure`]) - PostgreSQL and in-memory stores, caches, geolocation
//! - **API Layer** ([`api`]) - handlers, DTOs, extractors and middleware
//!
//! ## Request Paths
//!
//! `GET /{code}` resolves cache-first, answers `302`, and offers a click
//! event to a bounded queue. A background worker classifies and writes
//! events in batches; when the queue is full events are dropped and
//! counted, never blocking the redirect.
//!
//! ## Configuration
//!
//! Loaded from environment variables via [`config::Config`]. With
//! `STORAGE_BACKEND=memory` the service runs without PostgreSQL or Redis.

pub mod api;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod state;
pub mod utils;

pub mod config;
pub mod routes;
pub mod server;

pub use error::AppError;
pub use state::AppState;

/// Commonly used types for integration tests and embedders.
pub mod prelude {
    pub use crate::application::services::{
        AdminService, AnalyticsService, AuthService, LinkService, RedirectService,
    };
    pub use crate::domain::entities::{Account, Click, Link, NewLink};
    pub use crate::error::AppError;
    pub use crate::routes::{RouterOptions, app_router};
    pub use crate::state::{AppState, Repositories, ServiceSettings};
}
