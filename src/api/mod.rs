//! HTTP layer: routing, extraction and JSON mapping over the services.
//!
//! - [`dto`] - request and response bodies
//! - [`extract`] - client metadata and authenticated-user extractors
//! - [`handlers`] - endpoint handlers
//! - [`middleware`] - authentication, rate limiting, tracing
//! - [`routes`] - route tables

pub mod dto;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod routes;
