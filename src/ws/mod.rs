pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;

use crate::abuse::RateLimiter;
use crate::protocol::ServerMessage;
use crate::state::AppState;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let (connection_id, mut outbox) = state.connect().await;
    let mut limiter = RateLimiter::new(state.config.rate_limit_max, state.config.rate_limit_window);

    tracing::info!("WebSocket connected: {}", connection_id);

    loop {
        tokio::select! {
            // Messages addressed to this connection
            outbound = outbox.recv() => {
                let msg = match outbound {
                    Some(msg) => msg,
                    None => break,
                };
                let closing = matches!(msg, ServerMessage::JoinRejected { .. });
                if let Ok(json) = serde_json::to_string(&msg) {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                if closing {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            }

            // Handle client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        if limiter.check() {
                            handlers::handle_text(&state, &connection_id, text.as_str()).await;
                        } else {
                            tracing::debug!("Rate limited message from {}", connection_id);
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    state.disconnect(&connection_id).await;
    tracing::info!("WebSocket connection closed: {}", connection_id);
}
