//! Short code resolution for the redirect path.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::domain::click_event::RequestMetadata;
use crate::domain::click_ingestor::ClickIngestor;
use crate::domain::entities::Link;
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::infrastructure::cache::{CacheService, CachedLink};

/// Codes longer than this cannot exist and are rejected without a lookup.
const MAX_LOOKUP_CODE_LENGTH: usize = 32;

impl From<&Link> for CachedLink {
    fn from(link: &Link) -> Self {
        CachedLink {
            link_id: link.id,
            original_url: link.original_url.clone(),
            expires_at: link.expires_at,
        }
    }
}

/// Lookup budgets for [`RedirectService`].
#[derive(Debug, Clone, Copy)]
pub struct RedirectTimeouts {
    pub cache: Duration,
    pub store: Duration,
}

impl Default for RedirectTimeouts {
    fn default() -> Self {
        Self {
            cache: Duration::from_millis(5),
            store: Duration::from_millis(50),
        }
    }
}

/// Resolves short codes cache-first and hands click events to the ingestor.
///
/// A slow or failing cache is a miss; a slow or failing store is
/// `NotFound`, so an uncertain lookup never redirects.
pub struct RedirectService {
    links: Arc<dyn LinkRepository>,
    cache: Arc<dyn CacheService>,
    ingestor: ClickIngestor,
    cache_ttl: Duration,
    timeouts: RedirectTimeouts,
}

impl RedirectService {
    pub fn new(
        links: Arc<dyn LinkRepository>,
        cache: Arc<dyn CacheService>,
        ingestor: ClickIngestor,
        cache_ttl: Duration,
        timeouts: RedirectTimeouts,
    ) -> Self {
        Self {
            links,
            cache,
            ingestor,
            cache_ttl,
            timeouts,
        }
    }

    /// Resolves `short_code`, records the click and returns the destination.
    ///
    /// The click is offered to the ingestor without waiting; a dropped click
    /// does not affect the result.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] for unknown codes and failed lookups
    /// - [`AppError::Expired`] for links past their expiry
    pub async fn redirect(
        &self,
        short_code: &str,
        metadata: RequestMetadata,
    ) -> Result<String, AppError> {
        match self.resolve(short_code).await {
            Ok(entry) => {
                self.ingestor.record(entry.link_id, short_code, metadata);
                metrics::counter!("redirects_total", "outcome" => "redirected").increment(1);
                Ok(entry.original_url)
            }
            Err(e) => {
                let outcome = match e {
                    AppError::Expired { .. } => "expired",
                    _ => "not_found",
                };
                metrics::counter!("redirects_total", "outcome" => outcome).increment(1);
                Err(e)
            }
        }
    }

    /// Looks up a code without recording a click.
    ///
    /// Expiry is checked against the clock on every call, including cache
    /// hits.
    pub async fn resolve(&self, short_code: &str) -> Result<CachedLink, AppError> {
        if short_code.is_empty()
            || short_code.len() > MAX_LOOKUP_CODE_LENGTH
            || !short_code.bytes().all(|b| b.is_ascii_alphanumeric())
        {
            return Err(not_found(short_code));
        }

        let entry = match self.lookup_cache(short_code).await {
            Some(entry) => entry,
            None => self.lookup_store(short_code).await?,
        };

        if entry.is_expired_at(Utc::now()) {
            return Err(AppError::expired(
                "Short link has expired",
                json!({ "short_code": short_code, "expires_at": entry.expires_at }),
            ));
        }
        Ok(entry)
    }

    async fn lookup_cache(&self, short_code: &str) -> Option<CachedLink> {
        match timeout(self.timeouts.cache, self.cache.get(short_code)).await {
            Ok(Ok(hit)) => hit,
            Ok(Err(e)) => {
                warn!(short_code, "Cache lookup failed: {}", e);
                None
            }
            Err(_) => {
                debug!(short_code, "Cache lookup timed out");
                None
            }
        }
    }

    async fn lookup_store(&self, short_code: &str) -> Result<CachedLink, AppError> {
        let link = match timeout(self.timeouts.store, self.links.find_by_code(short_code)).await {
            Ok(Ok(Some(link))) => link,
            Ok(Ok(None)) => return Err(not_found(short_code)),
            Ok(Err(e)) => {
                warn!(short_code, "Store lookup failed: {}", e);
                return Err(not_found(short_code));
            }
            Err(_) => {
                warn!(short_code, "Store lookup timed out");
                return Err(not_found(short_code));
            }
        };

        let entry = CachedLink::from(&link);
        self.populate_cache(short_code, &entry).await;
        Ok(entry)
    }

    /// Caches a live entry, never past the link's expiry.
    ///
    /// A delete or extend can invalidate between the store read and the
    /// write, so the store is read again afterwards and the entry is evicted
    /// if it no longer matches.
    async fn populate_cache(&self, short_code: &str, entry: &CachedLink) {
        let ttl = match entry.expires_at {
            Some(at) => match (at - Utc::now()).to_std() {
                Ok(remaining) => remaining.min(self.cache_ttl),
                Err(_) => return,
            },
            None => self.cache_ttl,
        };
        if ttl.is_zero() {
            return;
        }

        match timeout(self.timeouts.cache, self.cache.set(short_code, entry, ttl)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(short_code, "Cache populate failed: {}", e);
                return;
            }
            Err(_) => debug!(short_code, "Cache populate timed out"),
        }

        let current = timeout(self.timeouts.store, self.links.find_by_code(short_code)).await;
        let unchanged = matches!(
            &current,
            Ok(Ok(Some(link))) if CachedLink::from(link) == *entry
        );
        if unchanged {
            return;
        }

        debug!(short_code, "Link changed during cache populate, evicting");
        match timeout(self.timeouts.cache, self.cache.invalidate(short_code)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(short_code, "Cache eviction failed: {}", e),
            Err(_) => warn!(short_code, "Cache eviction timed out"),
        }
    }
}

fn not_found(short_code: &str) -> AppError {
    AppError::not_found("Short link not found", json!({ "short_code": short_code }))
}
