//! Domain layer containing business entities and the click pipeline.
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//! - [`click_event`] - Click event captured on the redirect path
//! - [`click_ingestor`] - Bounded, non-blocking admission of click events
//! - [`click_worker`] - Batched background writer
//!
//! # Click Processing Flow
//!
//! 1. The redirect handler resolves a link and answers immediately
//! 2. A [`click_event::ClickEvent`] is offered to [`click_ingestor::ClickIngestor`]
//! 3. [`click_worker::ClickWorker`] classifies, batches and writes events with retries
//! 4. Raw events and rollups land together via [`repositories::ClickRepository`]

pub mod click_event;
pub mod click_ingestor;
pub mod click_worker;
pub mod entities;
pub mod repositories;
