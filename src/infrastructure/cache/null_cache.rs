//! No-op cache implementation for disabled caching.

use super::service::{CacheResult, CacheService, CachedLink};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// A cache implementation that stores nothing.
///
/// Every lookup misses, so each redirect resolves against storage.
pub struct NullCache;

impl NullCache {
    pub fn new() -> Self {
        debug!("Using NullCache (caching disabled)");
        Self
    }
}

impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheService for NullCache {
    async fn get(&self, _short_code: &str) -> CacheResult<Option<CachedLink>> {
        Ok(None)
    }

    async fn set(&self, _short_code: &str, _link: &CachedLink, _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn invalidate(&self, _short_code: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn backend(&self) -> &'static str {
        "none"
    }
}
