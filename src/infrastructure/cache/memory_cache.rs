//! In-process cache backed by moka.

use super::service::{CacheResult, CacheService, CachedLink};
use async_trait::async_trait;
use moka::future::Cache;
use moka::policy::Expiry;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Clone)]
struct Entry {
    link: CachedLink,
    ttl: Duration,
}

/// Expires each entry after the TTL it was stored with.
struct EntryExpiry;

impl Expiry<String, Entry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Bounded, per-process LRU-ish cache with per-entry TTLs.
pub struct MemoryCache {
    inner: Cache<String, Entry>,
}

impl MemoryCache {
    pub fn new(max_capacity: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryExpiry)
            .build();

        debug!("MemoryCache initialized with max capacity {}", max_capacity);
        Self { inner }
    }
}

#[async_trait]
impl CacheService for MemoryCache {
    async fn get(&self, short_code: &str) -> CacheResult<Option<CachedLink>> {
        Ok(self.inner.get(short_code).await.map(|entry| entry.link))
    }

    async fn set(&self, short_code: &str, link: &CachedLink, ttl: Duration) -> CacheResult<()> {
        if ttl.is_zero() {
            return Ok(());
        }
        let entry = Entry {
            link: link.clone(),
            ttl,
        };
        self.inner.insert(short_code.to_string(), entry).await;
        Ok(())
    }

    async fn invalidate(&self, short_code: &str) -> CacheResult<()> {
        self.inner.invalidate(short_code).await;
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
