//! Handler for health check endpoint.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse, QueueStatus};
use crate::state::AppState;

/// Returns service health status with component checks.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: All components healthy
/// - **503 Service Unavailable**: One or more components degraded
///
/// # Components Checked
///
/// 1. **Storage**: Counts links in the configured backend
/// 2. **Cache**: Backend ping
/// 3. **Click Queue**: Channel open, with depth and drop counters
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "checks": {
///     "storage": { "status": "ok", "message": "postgres: reachable" },
///     "cache": { "status": "ok" },
///     "click_queue": {
///       "status": "ok",
///       "capacity": 10000,
///       "depth": 3,
///       "admitted": 1280,
///       "dropped": 0
///     }
///   }
/// }
/// ```
///
/// A non-zero `dropped` does not degrade the status; it reports clicks lost
/// to a full queue.
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let storage = check_storage(&state).await;
    let cache = check_cache(&state).await;
    let click_queue = check_click_queue(&state);

    let all_healthy = storage.status == "ok" && cache.status == "ok" && click_queue.status == "ok";

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            storage,
            cache,
            click_queue,
        },
    };

    if all_healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

async fn check_storage(state: &AppState) -> CheckStatus {
    match state.link_service.ping().await {
        Ok(()) => CheckStatus {
            status: "ok".to_string(),
            message: Some(format!("{}: reachable", state.storage_backend)),
        },
        Err(e) => CheckStatus {
            status: "error".to_string(),
            message: Some(format!("{} error: {}", state.storage_backend, e)),
        },
    }
}

async fn check_cache(state: &AppState) -> CheckStatus {
    if state.cache.health_check().await {
        CheckStatus {
            status: "ok".to_string(),
            message: None,
        }
    } else {
        CheckStatus {
            status: "error".to_string(),
            message: Some("Cache backend unreachable".to_string()),
        }
    }
}

fn check_click_queue(state: &AppState) -> QueueStatus {
    let ingestor = &state.ingestor;
    QueueStatus {
        status: if ingestor.is_closed() { "error" } else { "ok" }.to_string(),
        capacity: ingestor.queue_capacity(),
        depth: ingestor.queue_depth(),
        admitted: ingestor.admitted_events(),
        dropped: ingestor.dropped_events(),
    }
}
