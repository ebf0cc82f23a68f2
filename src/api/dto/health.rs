//! DTOs for health check endpoint.

use serde::Serialize;

/// Health check response with component status.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub checks: HealthChecks,
}

/// Health status for each system component.
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub storage: CheckStatus,
    pub cache: CheckStatus,
    pub click_queue: QueueStatus,
}

/// Individual component health status.
#[derive(Debug, Serialize)]
pub struct CheckStatus {
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Ingest queue figures. `dropped` counts events lost to a full or closed
/// queue since startup.
#[derive(Debug, Serialize)]
pub struct QueueStatus {
    pub status: String,
    pub capacity: usize,
    pub depth: usize,
    pub admitted: u64,
    pub dropped: u64,
}
