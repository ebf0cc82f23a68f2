//! Business logic services for the application layer.

pub mod access_control;
pub mod admin_service;
pub mod aggregator;
pub mod analytics_service;
pub mod auth_service;
pub mod contact_service;
pub mod link_service;
pub mod redirect_service;

pub use access_control::{Action, Resource, authorize};
pub use admin_service::{AdminService, SiteStats};
pub use aggregator::{AggregationMode, Aggregator, RollupAggregator, ScanAggregator, aggregator_for};
pub use analytics_service::{AnalyticsService, LinkStats};
pub use auth_service::{AccessToken, AuthService, AuthSettings, Registration};
pub use contact_service::{ContactService, MAX_SUBMISSION_PAGE};
pub use link_service::{CreateLink, LinkService};
pub use redirect_service::{RedirectService, RedirectTimeouts};
