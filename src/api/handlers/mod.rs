//! HTTP request handlers.
//!
//! Each handler module corresponds to a logical grouping of endpoints.

pub mod admin;
pub mod analysis;
pub mod auth;
pub mod contact;
pub mod health;
pub mod links;
pub mod redirect;

pub use health::health_handler;
pub use redirect::redirect_handler;
