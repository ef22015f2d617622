use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;

use crate::api::ws_types::WsMessage;
use crate::AppState;

/// GET /ws — Push connection-state and status changes to a UI client.
pub async fn handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn send_json(socket: &mut WebSocket, msg: &WsMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => socket.send(Message::Text(json)).await.is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize WsMessage");
            true
        }
    }
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    tracing::info!("Status WebSocket client connected");

    let mut connection_rx = state.connection.clone();
    let mut status_rx = state.status.clone();

    // Current values first, then changes.
    let initial = [
        WsMessage::Connection(*connection_rx.borrow_and_update()),
        WsMessage::Status(status_rx.borrow_and_update().clone()),
    ];
    for msg in &initial {
        if !send_json(&mut socket, msg).await {
            return;
        }
    }

    loop {
        tokio::select! {
            changed = connection_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let msg = WsMessage::Connection(*connection_rx.borrow_and_update());
                if !send_json(&mut socket, &msg).await {
                    break;
                }
            }
            changed = status_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let msg = WsMessage::Status(status_rx.borrow_and_update().clone());
                if !send_json(&mut socket, &msg).await {
                    break;
                }
            }
            client_msg = socket.recv() => {
                match client_msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {} // ignore text/binary from client
                    Some(Err(_)) => break,
                }
            }
        }
    }

    tracing::info!("Status WebSocket client disconnected");
}
