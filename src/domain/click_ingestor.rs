//! Non-blocking admission of click events into the write queue.

use crate::domain::click_event::{ClickEvent, RequestMetadata};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;

/// Under sustained drops only every this-many-th drop is logged.
const DROP_LOG_EVERY: u64 = 1000;

/// Why an event was not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Queue at capacity.
    Full,
    /// Worker has stopped.
    Closed,
}

/// Outcome of [`ClickIngestor::record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Queued,
    Dropped(DropReason),
}

/// Producer side of the click queue.
///
/// Cloning is cheap; all clones share the queue and the counters.
/// [`ClickIngestor::record`] never awaits and never fails: under backpressure
/// the event is discarded and counted.
#[derive(Clone)]
pub struct ClickIngestor {
    tx: mpsc::Sender<ClickEvent>,
    admitted: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
}

impl ClickIngestor {
    /// Creates the ingestor and the receiver to hand to the click worker.
    ///
    /// A `capacity` of zero is raised to one.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ClickEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let ingestor = Self {
            tx,
            admitted: Arc::new(AtomicU64::new(0)),
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (ingestor, rx)
    }

    /// Builds a [`ClickEvent`] stamped with the current time and offers it to
    /// the queue.
    pub fn record(&self, link_id: i64, short_code: &str, metadata: RequestMetadata) -> Admission {
        let event = ClickEvent::new(link_id, short_code.to_string(), metadata);

        match self.tx.try_send(event) {
            Ok(()) => {
                self.admitted.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("clicks_admitted_total").increment(1);
                Admission::Queued
            }
            Err(TrySendError::Full(ev)) => {
                self.note_drop(&ev, "queue full");
                Admission::Dropped(DropReason::Full)
            }
            Err(TrySendError::Closed(ev)) => {
                self.note_drop(&ev, "queue closed");
                Admission::Dropped(DropReason::Closed)
            }
        }
    }

    fn note_drop(&self, event: &ClickEvent, reason: &'static str) {
        let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        metrics::counter!("clicks_dropped_total", "reason" => reason).increment(1);
        if !should_log_drop(total) {
            return;
        }
        warn!(
            short_code = %event.short_code,
            dropped_total = total,
            "Click event dropped: {}",
            reason
        );
    }

    /// Events discarded since startup.
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Events accepted into the queue since startup.
    pub fn admitted_events(&self) -> u64 {
        self.admitted.load(Ordering::Relaxed)
    }

    /// Events currently waiting in the queue.
    pub fn queue_depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn queue_capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// First drop and then one in every [`DROP_LOG_EVERY`].
fn should_log_drop(total: u64) -> bool {
    total == 1 || total % DROP_LOG_EVERY == 0
}
