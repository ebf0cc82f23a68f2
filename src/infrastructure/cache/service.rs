//! Cache service trait and error types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Errors that can occur during cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    ConnectionError(String),
    #[error("Cache operation error: {0}")]
    OperationError(String),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// What the redirect path needs to answer without touching storage.
///
/// The expiry instant is cached, never an "expired" flag: callers compare it
/// with the clock on every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedLink {
    pub link_id: i64,
    pub original_url: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedLink {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|e| now >= e)
    }
}

/// Trait for caching short code lookups.
///
/// Implementations must be thread-safe and fail open: a backend error is
/// logged and reported as a miss so the caller falls through to storage.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::MemoryCache`] - In-process moka cache
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed cache shared between instances
/// - [`crate::infrastructure::cache::NullCache`] - No-op implementation for disabled caching
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Returns `Ok(None)` on miss and, in production implementations, on
    /// backend errors.
    async fn get(&self, short_code: &str) -> CacheResult<Option<CachedLink>>;

    /// Stores an entry for at most `ttl`.
    async fn set(&self, short_code: &str, link: &CachedLink, ttl: Duration) -> CacheResult<()>;

    /// Removes an entry. Used when a link is deleted or its expiry changes.
    async fn invalidate(&self, short_code: &str) -> CacheResult<()>;

    /// Checks if the cache backend is healthy.
    async fn health_check(&self) -> bool;

    /// Backend name for logs and the health endpoint.
    fn backend(&self) -> &'static str;
}
