// WebSocket stream of published resource views

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{Duration, timeout};

use super::AppState;
use crate::models::{ResourceView, SystemInfo};

pub(super) const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

pub(super) async fn ws_resources(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    // Subscribe before the upgrade so no view published in between is missed.
    let mut rx = state.monitor.subscribe();
    let system_info = state.system_info.clone();
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = stream_resources(socket, &mut rx, system_info).await {
            tracing::info!("Resources stream error: {}", e);
        }
    })
}

async fn stream_resources(
    mut socket: WebSocket,
    rx: &mut broadcast::Receiver<Arc<ResourceView>>,
    system_info: Arc<SystemInfo>,
) -> anyhow::Result<()> {
    tracing::info!("Client connected to resources stream");

    let welcome = serde_json::json!({ "type": "info", "systemInfo": system_info.as_ref() });
    if !send_text(&mut socket, serde_json::to_string(&welcome)?).await {
        return Ok(());
    }

    let mut ping_interval = tokio::time::interval_at(
        tokio::time::Instant::now() + WS_PING_INTERVAL,
        WS_PING_INTERVAL,
    );
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(view) => {
                        let json = serde_json::to_string(view.as_ref())?;
                        if !send_text(&mut socket, json).await {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("WebSocket /ws/resources client lagged, skipped {} views", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = ping_interval.tick() => {
                let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Ping(Bytes::new()))).await;
                if !matches!(r, Ok(Ok(()))) {
                    break;
                }
            }
        }
    }
    tracing::info!("Client disconnected from resources stream");
    Ok(())
}

/// False when the client is gone or too slow to accept the frame.
async fn send_text(socket: &mut WebSocket, json: String) -> bool {
    let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Text(json.into()))).await;
    matches!(r, Ok(Ok(())))
}
