//! Shared application state injected into every handler.

use axum::http::HeaderName;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use crate::application::services::{
    AdminService, AggregationMode, AnalyticsService, AuthService, AuthSettings, ContactService,
    LinkService, RedirectService, RedirectTimeouts, aggregator_for,
};
use crate::domain::click_ingestor::ClickIngestor;
use crate::domain::repositories::{
    AccountRepository, ClickRepository, ContactRepository, LinkRepository,
};
use crate::infrastructure::cache::CacheService;
use crate::infrastructure::persistence::{
    MemoryStore, PgAccountRepository, PgClickRepository, PgContactRepository, PgLinkRepository,
};
use crate::utils::code_generator::CodeGenerator;

/// The repositories a storage backend provides.
#[derive(Clone)]
pub struct Repositories {
    pub links: Arc<dyn LinkRepository>,
    pub clicks: Arc<dyn ClickRepository>,
    pub accounts: Arc<dyn AccountRepository>,
    pub contacts: Arc<dyn ContactRepository>,
    pub backend: &'static str,
}

impl Repositories {
    pub fn postgres(pool: Arc<PgPool>) -> Self {
        Self {
            links: Arc::new(PgLinkRepository::new(pool.clone())),
            clicks: Arc::new(PgClickRepository::new(pool.clone())),
            accounts: Arc::new(PgAccountRepository::new(pool.clone())),
            contacts: Arc::new(PgContactRepository::new(pool)),
            backend: "postgres",
        }
    }

    /// A fresh single-process store; contents are lost on restart.
    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            links: store.clone(),
            clicks: store.clone(),
            accounts: store.clone(),
            contacts: store,
            backend: "memory",
        }
    }
}

/// How client metadata is read from redirect requests.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Trust `X-Forwarded-For` / `X-Real-IP` for the client address.
    pub behind_proxy: bool,
    /// Header carrying an upstream country code, e.g. `CF-IPCountry`.
    pub country_header: Option<HeaderName>,
    /// Origin prepended to short codes in responses, without a trailing slash.
    pub public_base_url: String,
}

/// Service tuning derived from [`crate::config::Config`].
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub short_code_length: usize,
    pub default_link_ttl_days: u32,
    pub cache_ttl: Duration,
    pub redirect_timeouts: RedirectTimeouts,
    pub aggregation_mode: AggregationMode,
    pub auth: AuthSettings,
    pub request_context: RequestContext,
}

#[derive(Clone)]
pub struct AppState {
    pub link_service: Arc<LinkService>,
    pub redirect_service: Arc<RedirectService>,
    pub analytics_service: Arc<AnalyticsService>,
    pub admin_service: Arc<AdminService>,
    pub auth_service: Arc<AuthService>,
    pub contact_service: Arc<ContactService>,
    pub cache: Arc<dyn CacheService>,
    pub ingestor: ClickIngestor,
    pub storage_backend: &'static str,
    pub request_context: Arc<RequestContext>,
}

impl AppState {
    pub fn new(
        repositories: Repositories,
        cache: Arc<dyn CacheService>,
        ingestor: ClickIngestor,
        settings: ServiceSettings,
    ) -> Self {
        let Repositories {
            links,
            clicks,
            accounts,
            contacts,
            backend,
        } = repositories;

        let link_service = Arc::new(LinkService::new(
            links.clone(),
            cache.clone(),
            CodeGenerator::new(settings.short_code_length),
            settings.default_link_ttl_days,
        ));
        let redirect_service = Arc::new(RedirectService::new(
            links.clone(),
            cache.clone(),
            ingestor.clone(),
            settings.cache_ttl,
            settings.redirect_timeouts,
        ));
        let aggregator = aggregator_for(settings.aggregation_mode, clicks.clone());
        let analytics_service = Arc::new(AnalyticsService::new(
            links.clone(),
            clicks.clone(),
            aggregator,
        ));
        let admin_service = Arc::new(AdminService::new(
            accounts.clone(),
            links,
            clicks,
            cache.clone(),
        ));
        let auth_service = Arc::new(AuthService::new(accounts, settings.auth));
        let contact_service = Arc::new(ContactService::new(contacts));

        Self {
            link_service,
            redirect_service,
            analytics_service,
            admin_service,
            auth_service,
            contact_service,
            cache,
            ingestor,
            storage_backend: backend,
            request_context: Arc::new(settings.request_context),
        }
    }
}
