#![allow(dead_code)]

use axum::ServiceExt;
use axum::extract::Request;
use axum_test::TestServer;
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use linkshorty::application::services::{AggregationMode, AuthSettings, RedirectTimeouts};
use linkshorty::domain::click_event::ClickEvent;
use linkshorty::domain::click_ingestor::ClickIngestor;
use linkshorty::domain::click_worker::{ClickWorker, ClickWorkerConfig};
use linkshorty::domain::entities::{AnalyticsScope, NewClick, TimeRange};
use linkshorty::infrastructure::cache::{CacheService, MemoryCache};
use linkshorty::infrastructure::geo::NoGeoLookup;
use linkshorty::routes::{RouterOptions, app_router};
use linkshorty::state::{AppState, Repositories, RequestContext, ServiceSettings};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const PASSWORD: &str = "correct-horse-battery";
pub const BASE_URL: &str = "http://sho.rt";

/// A router over the in-memory store, with direct handles for seeding and
/// inspection.
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub repositories: Repositories,
    /// Held when no worker runs so that the queue stays open and fills.
    pub click_rx: Option<mpsc::Receiver<ClickEvent>>,
}

pub fn settings() -> ServiceSettings {
    ServiceSettings {
        short_code_length: 7,
        default_link_ttl_days: 30,
        cache_ttl: Duration::from_secs(60),
        redirect_timeouts: RedirectTimeouts {
            cache: Duration::from_millis(200),
            store: Duration::from_millis(1000),
        },
        aggregation_mode: AggregationMode::Rollup,
        auth: AuthSettings {
            jwt_secret: "test-jwt-secret".to_string(),
            token_signing_secret: "test-signing-secret".to_string(),
            access_token_ttl: TimeDelta::minutes(30),
            verification_token_ttl: TimeDelta::hours(1),
            password_hash_cost: 4,
            superuser_emails: vec![ADMIN_EMAIL.to_string()],
        },
        request_context: RequestContext {
            behind_proxy: false,
            country_header: Some(axum::http::HeaderName::from_static("cf-ipcountry")),
            public_base_url: BASE_URL.to_string(),
        },
    }
}

/// App with a running click worker that flushes every 10ms.
pub fn spawn_app() -> TestApp {
    build(1000, true)
}

/// App whose click queue is never consumed.
pub fn spawn_app_without_worker(queue_capacity: usize) -> TestApp {
    build(queue_capacity, false)
}

fn build(queue_capacity: usize, run_worker: bool) -> TestApp {
    let repositories = Repositories::memory();
    let cache: Arc<dyn CacheService> = Arc::new(MemoryCache::new(1000));
    let (ingestor, rx) = ClickIngestor::new(queue_capacity);

    let click_rx = if run_worker {
        let worker = ClickWorker::new(
            repositories.clicks.clone(),
            repositories.links.clone(),
            Arc::new(NoGeoLookup),
            ClickWorkerConfig {
                batch_size: 10,
                flush_interval: Duration::from_millis(10),
                retry_base_delay: Duration::from_millis(1),
                ..ClickWorkerConfig::default()
            },
        );
        tokio::spawn(worker.run(rx));
        None
    } else {
        Some(rx)
    };

    let state = AppState::new(repositories.clone(), cache, ingestor, settings());
    let app = app_router(state.clone(), RouterOptions::default());
    let server = TestServer::new(ServiceExt::<Request>::into_make_service(app))
        .expect("test server");

    TestApp {
        server,
        state,
        repositories,
        click_rx,
    }
}

impl TestApp {
    /// Registers an account and returns its JSON representation.
    pub async fn register(&self, email: &str) -> Value {
        let response = self
            .server
            .post("/auth/register")
            .json(&json!({ "email": email, "password": PASSWORD }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()
    }

    /// Logs in and returns the bearer token.
    pub async fn login(&self, email: &str) -> String {
        let response = self
            .server
            .post("/auth/token")
            .form(&[("username", email), ("password", PASSWORD)])
            .await;
        response.assert_status_ok();
        response.json::<Value>()["access_token"]
            .as_str()
            .expect("access_token")
            .to_string()
    }

    /// Registers and logs in; returns `(account_id, token)`.
    pub async fn user(&self, email: &str) -> (i64, String) {
        let account = self.register(email).await;
        let token = self.login(email).await;
        (account["id"].as_i64().expect("id"), token)
    }

    pub async fn create_link(&self, token: &str, url: &str) -> Value {
        let response = self
            .server
            .post("/links")
            .authorization_bearer(token)
            .json(&json!({ "original_url": url }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()
    }

    /// Writes classified clicks straight to the store.
    pub async fn seed_clicks(&self, link_id: i64, clicks: &[(DateTime<Utc>, &str, &str)]) {
        let batch: Vec<NewClick> = clicks
            .iter()
            .map(|(at, country, device)| NewClick {
                link_id,
                short_code: String::new(),
                occurred_at: *at,
                country: country.to_string(),
                referrer: "Direct".to_string(),
                browser: "Firefox".to_string(),
                device: device.to_string(),
                ip_address: None,
            })
            .collect();
        self.repositories.clicks.insert_batch(&batch).await.unwrap();
    }

    /// Polls until `link_id` has `expected` stored clicks.
    pub async fn wait_for_clicks(&self, link_id: i64, expected: i64) {
        for _ in 0..200 {
            let stored = self
                .repositories
                .clicks
                .count(AnalyticsScope::Link(link_id), TimeRange::default())
                .await
                .unwrap();
            if stored >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("click worker did not write {expected} clicks for link {link_id}");
    }
}
