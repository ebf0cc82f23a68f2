//! Utility functions for code generation, URL validation and click
//! classification.
//!
//! - [`code_generator`] - Random base62 short codes
//! - [`url_validator`] - Destination URL checks
//! - [`user_agent`] - Browser and device categories from `User-Agent`
//! - [`referrer`] - Referrer host and country code normalisation

pub mod code_generator;
pub mod referrer;
pub mod url_validator;
pub mod user_agent;
