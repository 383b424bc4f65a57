//! Inbound frame handling
//!
//! Frames are parsed into the closed [`ClientMessage`] enum. Anything that
//! does not parse is noise and gets dropped without a reply.

use crate::protocol::ClientMessage;
use crate::state::AppState;

/// Parse a text frame, or None if it is malformed
pub fn parse_client_message(text: &str) -> Option<ClientMessage> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => Some(msg),
        Err(e) => {
            tracing::debug!("Dropping malformed message: {}", e);
            None
        }
    }
}

/// Handle one text frame from a connection
pub async fn handle_text(state: &AppState, connection_id: &str, text: &str) {
    tracing::debug!("Received message from {}: {}", connection_id, text);
    if let Some(msg) = parse_client_message(text) {
        state.handle_message(connection_id, msg).await;
    }
}
