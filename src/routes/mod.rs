// HTTP + WebSocket bridge for the dashboard front end

mod http;
mod ws;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::models::SystemInfo;
use crate::monitor::Monitor;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) monitor: Arc<Monitor>,
    pub(crate) system_info: Arc<SystemInfo>,
    pub(crate) config: AppConfig,
}

pub fn app(monitor: Arc<Monitor>, system_info: Arc<SystemInfo>, config: AppConfig) -> Router {
    let state = AppState {
        monitor,
        system_info,
        config,
    };
    Router::new()
        .route("/", get(|| async { "sysdash: resource monitor is up" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/info", get(http::api_info_handler)) // GET /api/info
        .route("/api/resources", get(http::resources_handler)) // GET /api/resources
        .route("/api/monitor", get(http::monitor_status_handler)) // GET /api/monitor
        .route("/api/monitor/start", post(http::monitor_start_handler)) // POST /api/monitor/start
        .route("/api/monitor/stop", post(http::monitor_stop_handler)) // POST /api/monitor/stop
        .route("/ws/resources", get(ws::ws_resources)) // WS /ws/resources
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
