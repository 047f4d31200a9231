//! WebSocket handler streaming evolution events.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use super::state::{AppState, ServerEvent};

/// WebSocket message from client to server
#[derive(Deserialize)]
#[serde(tag = "type")]
enum ClientMessage {
    /// Broadcast a fresh status of every experiment
    RequestStatus,
    /// Force a generation advance
    StartEvolution,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let mut event_rx = state.subscribe_events();

    // Task to send events to client
    let send_state = state.clone();
    let send_task = tokio::spawn(async move {
        let initial = ServerEvent::Status {
            experiments: send_state.statuses().await,
        };
        if let Ok(json) = serde_json::to_string(&initial) {
            let _ = sender.send(Message::Text(json.into())).await;
        }

        loop {
            match event_rx.recv().await {
                Ok(event) => match serde_json::to_string(event.as_ref()) {
                    Ok(json) => {
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            // Client disconnected
                            break;
                        }
                    }
                    Err(e) => {
                        log::error!("Failed to serialize event: {}", e);
                    }
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    log::warn!("WebSocket client lagged, skipped {} events", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                    break;
                }
            }
        }
    });

    // Task to receive commands from client
    let recv_state = state.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::RequestStatus) => {
                        let experiments = recv_state.statuses().await;
                        recv_state.broadcast(ServerEvent::Status { experiments });
                    }
                    Ok(ClientMessage::StartEvolution) => {
                        recv_state.run_evolution().await;
                    }
                    Err(e) => {
                        log::debug!("Ignoring WebSocket message: {}", e);
                    }
                },
                Ok(Message::Close(_)) => {
                    break;
                }
                Err(e) => {
                    log::error!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    // Wait for either task to complete (client disconnect)
    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    log::debug!("WebSocket client disconnected");
}
