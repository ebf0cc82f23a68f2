//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer.
//!
//! # Modules
//!
//! - [`cache`] - Lookup caches (moka, Redis and no-op implementations)
//! - [`persistence`] - PostgreSQL and in-memory repository implementations
//! - [`geo`] - IP geolocation seam used by the click worker

pub mod cache;
pub mod geo;
pub mod persistence;
