// GET/POST handlers: version, info, one-shot resources, monitor control

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::time::Duration;

use super::AppState;
use crate::monitor::MonitorError;
use crate::version::{NAME, VERSION};

/// GET /version: returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/info: returns static system identity (read once at startup).
pub(super) async fn api_info_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.system_info.as_ref().clone())
}

/// GET /api/resources: one-shot hardware report, independent of the poll loop.
pub(super) async fn resources_handler(State(state): State<AppState>) -> Response {
    match state.monitor.sample_once().await {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, operation = "sample_once", "one-shot sample failed");
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
    }
}

/// GET /api/monitor: state and tick counters.
pub(super) async fn monitor_status_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.monitor.status().await)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct StartParams {
    interval_ms: Option<u64>,
}

/// POST /api/monitor/start[?intervalMs=N]: defaults to monitoring.sample_interval_ms.
pub(super) async fn monitor_start_handler(
    State(state): State<AppState>,
    Query(params): Query<StartParams>,
) -> Response {
    let interval_ms = params
        .interval_ms
        .unwrap_or(state.config.monitoring.sample_interval_ms);
    match state
        .monitor
        .start(Duration::from_millis(interval_ms))
        .await
    {
        Ok(()) => Json(state.monitor.status().await).into_response(),
        Err(e @ MonitorError::AlreadyRunning) => error_response(StatusCode::CONFLICT, e.to_string()),
        Err(e @ MonitorError::ZeroInterval) => {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e @ MonitorError::Unavailable(_)) => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
    }
}

/// POST /api/monitor/stop: returns once no further views will be published.
pub(super) async fn monitor_stop_handler(State(state): State<AppState>) -> impl IntoResponse {
    state.monitor.stop().await;
    Json(state.monitor.status().await)
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}
