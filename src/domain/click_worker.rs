//! Background writer that drains the click queue into storage.
//!
//! Events are classified, grouped into batches and written with bounded
//! exponential-backoff retries. Up to `concurrency` batch writes run at once.
//! When every sender is gone the worker flushes what is left, waits for
//! in-flight writes and returns.

use crate::domain::click_event::ClickEvent;
use crate::domain::entities::{NewClick, UNKNOWN};
use crate::domain::repositories::{ClickRepository, LinkRepository};
use crate::infrastructure::geo::GeoLookup;
use crate::utils::referrer::{classify_referrer, normalize_country};
use crate::utils::user_agent::classify_user_agent;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, error, info, warn};

/// Tuning for [`ClickWorker`].
#[derive(Debug, Clone)]
pub struct ClickWorkerConfig {
    pub batch_size: usize,
    pub flush_interval: Duration,
    /// Retries after the first failed attempt.
    pub write_retries: usize,
    /// First backoff delay; doubles on each retry.
    pub retry_base_delay: Duration,
    pub max_retry_delay: Duration,
    pub concurrency: usize,
}

impl Default for ClickWorkerConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            flush_interval: Duration::from_millis(1000),
            write_retries: 3,
            retry_base_delay: Duration::from_millis(100),
            max_retry_delay: Duration::from_secs(5),
            concurrency: 2,
        }
    }
}

struct BatchWriter {
    clicks: Arc<dyn ClickRepository>,
    links: Arc<dyn LinkRepository>,
    geo: Arc<dyn GeoLookup>,
    config: ClickWorkerConfig,
}

/// Consumer side of the click queue.
pub struct ClickWorker {
    writer: Arc<BatchWriter>,
}

impl ClickWorker {
    pub fn new(
        clicks: Arc<dyn ClickRepository>,
        links: Arc<dyn LinkRepository>,
        geo: Arc<dyn GeoLookup>,
        config: ClickWorkerConfig,
    ) -> Self {
        Self {
            writer: Arc::new(BatchWriter {
                clicks,
                links,
                geo,
                config,
            }),
        }
    }

    /// Runs until the channel is closed and drained.
    pub async fn run(self, mut rx: mpsc::Receiver<ClickEvent>) {
        let config = &self.writer.config;
        let batch_size = config.batch_size.max(1);
        let permits = Arc::new(Semaphore::new(config.concurrency.max(1)));
        let mut in_flight: JoinSet<()> = JoinSet::new();
        let mut batch: Vec<ClickEvent> = Vec::with_capacity(batch_size);

        let mut ticker = tokio::time::interval(config.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            batch_size,
            concurrency = config.concurrency,
            geo = self.writer.geo.name(),
            "Click worker started"
        );

        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Some(event) => {
                        batch.push(event);
                        if batch.len() >= batch_size {
                            self.dispatch(&mut batch, &permits, &mut in_flight).await;
                        }
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    if !batch.is_empty() {
                        self.dispatch(&mut batch, &permits, &mut in_flight).await;
                    }
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        error!("Click batch task failed: {}", e);
                    }
                }
            }
        }

        if !batch.is_empty() {
            self.dispatch(&mut batch, &permits, &mut in_flight).await;
        }
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                error!("Click batch task failed: {}", e);
            }
        }

        info!("Click worker stopped, queue drained");
    }

    async fn dispatch(
        &self,
        batch: &mut Vec<ClickEvent>,
        permits: &Arc<Semaphore>,
        in_flight: &mut JoinSet<()>,
    ) {
        let events = std::mem::replace(batch, Vec::with_capacity(self.writer.config.batch_size));

        let Ok(permit) = permits.clone().acquire_owned().await else {
            error!(count = events.len(), "Click write semaphore closed");
            metrics::counter!("clicks_lost_total").increment(events.len() as u64);
            return;
        };

        let writer = self.writer.clone();
        in_flight.spawn(async move {
            writer.write(events).await;
            drop(permit);
        });
    }
}

impl BatchWriter {
    async fn write(&self, events: Vec<ClickEvent>) {
        let mut clicks = Vec::with_capacity(events.len());
        for event in events {
            clicks.push(self.classify(event).await);
        }

        let strategy = ExponentialBackoff::from_millis(2)
            .factor((self.config.retry_base_delay.as_millis() as u64 / 2).max(1))
            .max_delay(self.config.max_retry_delay)
            .map(jitter)
            .take(self.config.write_retries);

        let written = Retry::start(strategy, || async {
            self.clicks.insert_batch(&clicks).await.inspect_err(|e| {
                warn!(count = clicks.len(), "Click batch write failed: {}", e);
            })
        })
        .await;

        match written {
            Ok(written) => {
                debug!("Wrote {} of {} click events", written, clicks.len());
                metrics::counter!("clicks_written_total").increment(written);
                self.bump_counters(&clicks).await;
            }
            Err(e) => {
                error!(
                    count = clicks.len(),
                    "Click batch lost after {} retries: {}", self.config.write_retries, e
                );
                metrics::counter!("clicks_lost_total").increment(clicks.len() as u64);
            }
        }
    }

    async fn classify(&self, event: ClickEvent) -> NewClick {
        let metadata = event.metadata;
        let ua = classify_user_agent(metadata.user_agent.as_deref());

        let mut country = metadata.country_hint.as_deref().and_then(normalize_country);
        if country.is_none()
            && let Some(ip) = metadata.ip
        {
            country = self.geo.lookup(ip).await.as_deref().and_then(normalize_country);
        }

        NewClick {
            link_id: event.link_id,
            short_code: event.short_code,
            occurred_at: event.occurred_at,
            country: country.unwrap_or_else(|| UNKNOWN.to_string()),
            referrer: classify_referrer(metadata.referer.as_deref()),
            browser: ua.browser,
            device: ua.device,
            ip_address: metadata.ip.map(|ip| ip.to_string()),
        }
    }

    /// Best-effort update of the denormalized counters; periodic
    /// reconciliation repairs any miss.
    async fn bump_counters(&self, clicks: &[NewClick]) {
        let mut per_code: HashMap<&str, i64> = HashMap::new();
        for click in clicks {
            *per_code.entry(click.short_code.as_str()).or_default() += 1;
        }

        for (code, by) in per_code {
            if let Err(e) = self.links.increment_clicks(code, by).await {
                warn!(short_code = code, "Failed to bump click counter: {}", e);
            }
        }
    }
}
