//! Application layer services implementing business logic.
//!
//! Services coordinate repository calls, validation and authorization, and
//! expose the operations HTTP handlers call.
//!
//! - [`services::LinkService`] - Code minting and link lifecycle
//! - [`services::RedirectService`] - Cache-first resolution and click hand-off
//! - [`services::AnalyticsService`] - Per-link stats and owner analysis
//! - [`services::AdminService`] - Account management and site figures
//! - [`services::AuthService`] - Registration, login and bearer tokens

pub mod services;
