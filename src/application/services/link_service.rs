//! Link creation, listing and lifecycle service.

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::application::services::access_control::{Action, Resource, authorize};
use crate::domain::entities::{Account, Link, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::infrastructure::cache::CacheService;
use crate::utils::code_generator::{CodeGenerator, is_reserved};
use crate::utils::url_validator::validate_url;

/// Generation attempts before giving up with `CodeSpaceExhausted`.
pub const MAX_CODE_ATTEMPTS: usize = 5;

pub const MAX_TAG_LENGTH: usize = 100;

/// Longest single extension accepted by [`LinkService::extend_expiration`].
pub const MAX_EXTEND_DAYS: i64 = 3650;

/// Input for [`LinkService::create`].
#[derive(Debug, Clone, Default)]
pub struct CreateLink {
    pub original_url: String,
    pub tag: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Service for creating, listing, extending and deleting short links.
///
/// Owns the cache invalidation that accompanies every mutation visible to
/// the redirect path.
pub struct LinkService {
    links: Arc<dyn LinkRepository>,
    cache: Arc<dyn CacheService>,
    generator: CodeGenerator,
    default_ttl: Option<TimeDelta>,
}

impl LinkService {
    /// `default_ttl_days = 0` creates links that never expire unless the
    /// caller passes `expires_at`.
    pub fn new(
        links: Arc<dyn LinkRepository>,
        cache: Arc<dyn CacheService>,
        generator: CodeGenerator,
        default_ttl_days: u32,
    ) -> Self {
        let default_ttl = (default_ttl_days > 0).then(|| TimeDelta::days(i64::from(default_ttl_days)));
        Self {
            links,
            cache,
            generator,
            default_ttl,
        }
    }

    /// Creates a link owned by `owner` under a freshly generated code.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if:
    /// - the URL is not an absolute http/https URL with a host
    /// - the tag is longer than [`MAX_TAG_LENGTH`] characters
    /// - `expires_at` is not in the future
    ///
    /// Returns [`AppError::CodeSpaceExhausted`] if no free code was found in
    /// [`MAX_CODE_ATTEMPTS`] tries.
    pub async fn create(&self, owner: &Account, input: CreateLink) -> Result<Link, AppError> {
        validate_url(&input.original_url).map_err(|e| {
            AppError::bad_request("Invalid URL", json!({ "reason": e.to_string() }))
        })?;

        let tag = input.tag.filter(|t| !t.trim().is_empty());
        if let Some(tag) = &tag
            && tag.chars().count() > MAX_TAG_LENGTH
        {
            return Err(AppError::bad_request(
                "Tag is too long",
                json!({ "max_length": MAX_TAG_LENGTH }),
            ));
        }

        let now = Utc::now();
        let expires_at = match input.expires_at {
            Some(at) if at <= now => {
                return Err(AppError::bad_request(
                    "Expiration must be in the future",
                    json!({ "expires_at": at }),
                ));
            }
            Some(at) => Some(at),
            None => self.default_ttl.map(|ttl| now + ttl),
        };

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let short_code = self.generator.generate();
            if is_reserved(&short_code) {
                continue;
            }

            let new_link = NewLink {
                short_code,
                original_url: input.original_url.clone(),
                owner_id: owner.id,
                tag: tag.clone(),
                expires_at,
            };

            if let Some(link) = self.links.insert_if_absent(new_link).await? {
                info!(
                    link_id = link.id,
                    short_code = %link.short_code,
                    owner_id = owner.id,
                    "Link created"
                );
                return Ok(link);
            }
            warn!(attempt, "Short code collision, regenerating");
        }

        metrics::counter!("links_code_space_exhausted_total").increment(1);
        error!(
            attempts = MAX_CODE_ATTEMPTS,
            code_length = self.generator.length(),
            "Short code space exhausted"
        );
        Err(AppError::code_space_exhausted(
            "Failed to generate a unique short code",
            json!({ "attempts": MAX_CODE_ATTEMPTS }),
        ))
    }

    /// Loads a link and checks that `actor` may perform `action` on it.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no link has this id, and
    /// [`AppError::Forbidden`] if the check fails.
    pub async fn get_authorized(
        &self,
        actor: &Account,
        id: i64,
        action: Action,
    ) -> Result<Link, AppError> {
        let link = self
            .links
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Link not found", json!({ "id": id })))?;

        authorize(actor, action, Resource::Link(&link))?;
        Ok(link)
    }

    pub async fn list_for_owner(&self, owner: &Account) -> Result<Vec<Link>, AppError> {
        self.links.list_for_owner(owner.id).await
    }

    /// Owned links that have not expired yet.
    pub async fn list_active_for_owner(&self, owner: &Account) -> Result<Vec<Link>, AppError> {
        let now = Utc::now();
        let links = self.links.list_for_owner(owner.id).await?;
        Ok(links.into_iter().filter(|l| !l.is_expired_at(now)).collect())
    }

    pub async fn list_all(&self, actor: &Account) -> Result<Vec<Link>, AppError> {
        authorize(actor, Action::ListAllLinks, Resource::Site)?;
        self.links.list_all().await
    }

    pub async fn list_expired(&self, actor: &Account) -> Result<Vec<Link>, AppError> {
        authorize(actor, Action::ListExpiredLinks, Resource::Site)?;
        self.links.list_expired(Utc::now()).await
    }

    /// Pushes the expiry of a link `days` further out, counting from now if
    /// it has already lapsed. Links without an expiry get one.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] unless `1 <= days <= MAX_EXTEND_DAYS`.
    pub async fn extend_expiration(
        &self,
        actor: &Account,
        id: i64,
        days: i64,
    ) -> Result<Link, AppError> {
        if !(1..=MAX_EXTEND_DAYS).contains(&days) {
            return Err(AppError::bad_request(
                "days must be between 1 and 3650",
                json!({ "days": days }),
            ));
        }

        let link = self.get_authorized(actor, id, Action::ExtendLink).await?;
        let base = link
            .expires_at
            .map_or_else(Utc::now, |at| at.max(Utc::now()));
        let new_expiry = base + TimeDelta::days(days);

        let updated = self
            .links
            .update_expiration(id, Some(new_expiry))
            .await?
            .ok_or_else(|| AppError::not_found("Link not found", json!({ "id": id })))?;
        self.invalidate(&updated.short_code).await;

        info!(link_id = id, expires_at = %new_expiry, "Link expiration extended");
        Ok(updated)
    }

    /// Deletes a link, its clicks and rollups, and evicts it from the cache.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] or [`AppError::Forbidden`].
    pub async fn delete(&self, actor: &Account, id: i64) -> Result<(), AppError> {
        let link = self.get_authorized(actor, id, Action::DeleteLink).await?;

        if !self.links.delete(id).await? {
            return Err(AppError::not_found("Link not found", json!({ "id": id })));
        }
        self.invalidate(&link.short_code).await;

        info!(link_id = id, short_code = %link.short_code, actor_id = actor.id, "Link deleted");
        Ok(())
    }

    /// Round trip to the link store for health reporting.
    pub async fn ping(&self) -> Result<(), AppError> {
        self.links.ping().await
    }

    /// Resets every denormalized click counter to its event count.
    pub async fn reconcile_click_counts(&self) -> Result<u64, AppError> {
        let changed = self.links.reconcile_click_counts().await?;
        if changed > 0 {
            info!(changed, "Reconciled link click counters");
        }
        Ok(changed)
    }

    async fn invalidate(&self, short_code: &str) {
        if let Err(e) = self.cache.invalidate(short_code).await {
            warn!(short_code, "Cache invalidation failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::MockLinkRepository;
    use crate::infrastructure::cache::{CachedLink, MemoryCache, NullCache};
    use crate::infrastructure::persistence::MemoryStore;
    use std::collections::HashSet;
    use std::time::Duration;

    fn account(id: i64, is_superuser: bool) -> Account {
        Account {
            id,
            email: format!("user{id}@example.com"),
            password_hash: String::new(),
            is_active: true,
            is_superuser,
            is_verified: true,
            created_at: Utc::now(),
        }
    }

    fn link_from(new_link: NewLink, id: i64) -> Link {
        Link {
            id,
            short_code: new_link.short_code,
            original_url: new_link.original_url,
            owner_id: new_link.owner_id,
            tag: new_link.tag,
            created_at: Utc::now(),
            expires_at: new_link.expires_at,
            click_count: 0,
        }
    }

    fn service_with(repo: MockLinkRepository) -> LinkService {
        LinkService::new(
            Arc::new(repo),
            Arc::new(NullCache::new()),
            CodeGenerator::default(),
            30,
        )
    }

    fn input(url: &str) -> CreateLink {
        CreateLink {
            original_url: url.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_ping_does_not_scan_links() {
        let mut repo = MockLinkRepository::new();
        repo.expect_ping().times(1).returning(|| Ok(()));
        repo.expect_count().never();

        assert!(service_with(repo).ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_ping_surfaces_store_errors() {
        let mut repo = MockLinkRepository::new();
        repo.expect_ping()
            .returning(|| Err(AppError::internal("connection refused", serde_json::json!({}))));

        let err = service_with(repo).ping().await.unwrap_err();
        assert!(matches!(err, AppError::Internal { .. }));
    }

    #[tokio::test]
    async fn test_create_applies_default_ttl() {
        let mut repo = MockLinkRepository::new();
        repo.expect_insert_if_absent()
            .times(1)
            .returning(|new_link| Ok(Some(link_from(new_link, 1))));

        let link = service_with(repo)
            .create(&account(1, false), input("https://example.com/page"))
            .await
            .unwrap();

        assert_eq!(link.original_url, "https://example.com/page");
        assert_eq!(link.short_code.len(), 7);
        let days = link.expires_in_days(Utc::now()).unwrap();
        assert!((29..=30).contains(&days));
    }

    #[tokio::test]
    async fn test_create_without_default_ttl_never_expires() {
        let mut repo = MockLinkRepository::new();
        repo.expect_insert_if_absent()
            .returning(|new_link| Ok(Some(link_from(new_link, 1))));
        let service = LinkService::new(
            Arc::new(repo),
            Arc::new(NullCache::new()),
            CodeGenerator::default(),
            0,
        );

        let link = service
            .create(&account(1, false), input("https://example.com"))
            .await
            .unwrap();

        assert!(link.expires_at.is_none());
    }

    #[tokio::test]
    async fn test_create_retries_on_collision() {
        let mut repo = MockLinkRepository::new();
        let mut calls = 0;
        repo.expect_insert_if_absent().times(3).returning(move |new_link| {
            calls += 1;
            if calls < 3 {
                Ok(None)
            } else {
                Ok(Some(link_from(new_link, 1)))
            }
        });

        let result = service_with(repo)
            .create(&account(1, false), input("https://example.com"))
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_create_fails_after_max_attempts() {
        let mut repo = MockLinkRepository::new();
        repo.expect_insert_if_absent()
            .times(MAX_CODE_ATTEMPTS)
            .returning(|_| Ok(None));

        let err = service_with(repo)
            .create(&account(1, false), input("https://example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::CodeSpaceExhausted { .. }));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let mut repo = MockLinkRepository::new();
        repo.expect_insert_if_absent().never();
        let service = service_with(repo);
        let owner = account(1, false);

        for bad in ["ftp://example.com", "example.com", " https://example.com"] {
            let err = service.create(&owner, input(bad)).await.unwrap_err();
            assert!(matches!(err, AppError::Validation { .. }), "{bad}");
        }

        let long_tag = CreateLink {
            original_url: "https://example.com".to_string(),
            tag: Some("t".repeat(MAX_TAG_LENGTH + 1)),
            expires_at: None,
        };
        assert!(matches!(
            service.create(&owner, long_tag).await.unwrap_err(),
            AppError::Validation { .. }
        ));

        let past = CreateLink {
            original_url: "https://example.com".to_string(),
            tag: None,
            expires_at: Some(Utc::now() - TimeDelta::minutes(1)),
        };
        assert!(matches!(
            service.create(&owner, past).await.unwrap_err(),
            AppError::Validation { .. }
        ));
    }

    #[tokio::test]
    async fn test_concurrent_creates_yield_unique_codes() {
        let service = Arc::new(LinkService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(NullCache::new()),
            CodeGenerator::new(6),
            30,
        ));
        let owner = account(1, false);

        let mut handles = Vec::new();
        for i in 0..200 {
            let service = service.clone();
            let owner = owner.clone();
            handles.push(tokio::spawn(async move {
                service
                    .create(&owner, input(&format!("https://example.com/{i}")))
                    .await
                    .unwrap()
            }));
        }

        let mut codes = HashSet::new();
        for handle in handles {
            let link = handle.await.unwrap();
            assert!(codes.insert(link.short_code));
        }
        assert_eq!(codes.len(), 200);
    }

    #[tokio::test]
    async fn test_delete_by_non_owner_is_forbidden() {
        let store = Arc::new(MemoryStore::new());
        let service = LinkService::new(
            store.clone(),
            Arc::new(NullCache::new()),
            CodeGenerator::default(),
            30,
        );
        let link = service
            .create(&account(1, false), input("https://example.com"))
            .await
            .unwrap();

        let err = service.delete(&account(2, false), link.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));
        assert!(store.find_by_id(link.id).await.unwrap().is_some());

        let err = service.delete(&account(1, false), 999).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_evicts_cache_entry() {
        let cache = Arc::new(MemoryCache::new(100));
        let service = LinkService::new(
            Arc::new(MemoryStore::new()),
            cache.clone(),
            CodeGenerator::default(),
            30,
        );
        let owner = account(1, false);
        let link = service.create(&owner, input("https://example.com")).await.unwrap();

        let entry = CachedLink {
            link_id: link.id,
            original_url: link.original_url.clone(),
            expires_at: link.expires_at,
        };
        cache
            .set(&link.short_code, &entry, Duration::from_secs(60))
            .await
            .unwrap();

        service.delete(&owner, link.id).await.unwrap();

        assert!(cache.get(&link.short_code).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_extend_expiration_requires_superuser_and_pushes_expiry() {
        let service = LinkService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(NullCache::new()),
            CodeGenerator::default(),
            30,
        );
        let owner = account(1, false);
        let admin = account(9, true);
        let link = service.create(&owner, input("https://example.com")).await.unwrap();
        let before = link.expires_at.unwrap();

        let err = service.extend_expiration(&owner, link.id, 5).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));

        let extended = service.extend_expiration(&admin, link.id, 5).await.unwrap();
        assert_eq!(extended.expires_at.unwrap(), before + TimeDelta::days(5));

        let err = service.extend_expiration(&admin, link.id, 0).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_list_active_excludes_expired() {
        let store = Arc::new(MemoryStore::new());
        let service = LinkService::new(
            store.clone(),
            Arc::new(NullCache::new()),
            CodeGenerator::default(),
            30,
        );
        let owner = account(1, false);
        let admin = account(9, true);

        let live = service.create(&owner, input("https://example.com/a")).await.unwrap();
        let lapsed = service.create(&owner, input("https://example.com/b")).await.unwrap();
        store
            .update_expiration(lapsed.id, Some(Utc::now() - TimeDelta::seconds(1)))
            .await
            .unwrap();

        let active = service.list_active_for_owner(&owner).await.unwrap();
        assert_eq!(active.iter().map(|l| l.id).collect::<Vec<_>>(), vec![live.id]);

        assert_eq!(service.list_for_owner(&owner).await.unwrap().len(), 2);

        let expired = service.list_expired(&admin).await.unwrap();
        assert_eq!(expired.iter().map(|l| l.id).collect::<Vec<_>>(), vec![lapsed.id]);
        assert!(service.list_expired(&owner).await.is_err());
    }
}
