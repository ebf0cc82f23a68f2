//! Core domain entities representing the business data model.
//!
//! Entities are plain data structures. Each persisted entity has a `New*`
//! counterpart carrying only the fields supplied at creation time.
//!
//! - [`Link`] - A short code mapped to a destination URL
//! - [`Click`] - One recorded redirect
//! - [`Account`] - A dashboard user
//! - [`ContactSubmission`] - A contact form message
//! - [`analytics`] - Aggregation scopes, intervals and dimensions

pub mod account;
pub mod analytics;
pub mod click;
pub mod contact;
pub mod link;

pub use account::{Account, NewAccount};
pub use analytics::{AnalyticsScope, Dimension, Interval, RollupRow, TimeBucket, TimeRange};
pub use click::{Click, NewClick, UNKNOWN};
pub use contact::{ContactSubmission, NewContactSubmission};
pub use link::{Link, NewLink};
