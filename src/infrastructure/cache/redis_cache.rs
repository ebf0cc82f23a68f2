//! Redis-backed cache implementation.

use super::service::{CacheError, CacheResult, CacheService, CachedLink};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Redis cache shared by every service instance.
///
/// Entries are stored as JSON under a `link:` prefix. Uses `ConnectionManager`
/// for reconnects. All operations are fail-open: errors are logged but don't
/// propagate to callers.
pub struct RedisCache {
    client: ConnectionManager,
    key_prefix: String,
}

impl RedisCache {
    /// Connects to Redis and validates the connection with a PING.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ConnectionError`] if the URL is invalid, the connection cannot
    /// be established, or the PING health check fails.
    pub async fn connect(redis_url: &str) -> CacheResult<Self> {
        info!("Connecting to Redis");

        let client = Client::open(redis_url).map_err(|e| {
            CacheError::ConnectionError(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| CacheError::ConnectionError(format!("Redis PING failed: {}", e)))?;

        info!("✓ Connected to Redis");

        Ok(Self {
            client: manager,
            key_prefix: "link:".to_string(),
        })
    }

    fn build_key(&self, short_code: &str) -> String {
        format!("{}{}", self.key_prefix, short_code)
    }
}

#[async_trait]
impl CacheService for RedisCache {
    async fn get(&self, short_code: &str) -> CacheResult<Option<CachedLink>> {
        let key = self.build_key(short_code);
        let mut conn = self.client.clone();

        match conn.get::<_, Option<String>>(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<CachedLink>(&raw) {
                Ok(link) => {
                    debug!("Cache HIT: {}", short_code);
                    Ok(Some(link))
                }
                Err(e) => {
                    warn!("Discarding unreadable cache entry for {}: {}", short_code, e);
                    let _: Result<i32, _> = conn.del(&key).await;
                    Ok(None)
                }
            },
            Ok(None) => {
                debug!("Cache MISS: {}", short_code);
                Ok(None)
            }
            Err(e) => {
                error!("Redis GET error for {}: {}", short_code, e);
                Ok(None)
            }
        }
    }

    async fn set(&self, short_code: &str, link: &CachedLink, ttl: Duration) -> CacheResult<()> {
        let ttl_seconds = ttl.as_secs();
        if ttl_seconds == 0 {
            return Ok(());
        }

        let payload = serde_json::to_string(link)
            .map_err(|e| CacheError::OperationError(format!("Failed to encode entry: {}", e)))?;
        let key = self.build_key(short_code);
        let mut conn = self.client.clone();

        match conn.set_ex::<_, _, ()>(&key, payload, ttl_seconds).await {
            Ok(_) => {
                debug!("Cache SET: {} (TTL: {}s)", short_code, ttl_seconds);
                Ok(())
            }
            Err(e) => {
                warn!("Redis SET error for {}: {}", short_code, e);
                Ok(())
            }
        }
    }

    async fn invalidate(&self, short_code: &str) -> CacheResult<()> {
        let key = self.build_key(short_code);
        let mut conn = self.client.clone();

        match conn.del::<_, i32>(&key).await {
            Ok(deleted) => {
                if deleted > 0 {
                    debug!("Cache INVALIDATE: {}", short_code);
                }
                Ok(())
            }
            Err(e) => {
                warn!("Redis DEL error for {}: {}", short_code, e);
                Ok(())
            }
        }
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        conn.ping::<()>().await.is_ok()
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
