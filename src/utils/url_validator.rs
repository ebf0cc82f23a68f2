//! Destination URL validation.

use url::Url;

/// Longest destination URL accepted, in bytes.
pub const MAX_URL_LENGTH: usize = 2048;

/// Reasons a destination URL is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlValidationError {
    #[error("URL is empty")]
    Empty,
    #[error("URL must not contain leading or trailing whitespace")]
    Whitespace,
    #[error("URL exceeds {MAX_URL_LENGTH} bytes")]
    TooLong,
    #[error("URL is not absolute: {0}")]
    Parse(String),
    #[error("unsupported scheme '{0}', expected http or https")]
    Scheme(String),
    #[error("URL has no host")]
    MissingHost,
}

/// Checks that `input` is an absolute `http`/`https` URL with a host.
///
/// The input is validated, not rewritten; callers store it byte-for-byte so
/// that a redirect returns exactly what was submitted.
pub fn validate_url(input: &str) -> Result<(), UrlValidationError> {
    if input.is_empty() {
        return Err(UrlValidationError::Empty);
    }
    if input.trim() != input {
        return Err(UrlValidationError::Whitespace);
    }
    if input.len() > MAX_URL_LENGTH {
        return Err(UrlValidationError::TooLong);
    }

    let url = Url::parse(input).map_err(|e| UrlValidationError::Parse(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(UrlValidationError::Scheme(other.to_string())),
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(UrlValidationError::MissingHost),
    }
}
