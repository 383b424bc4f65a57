pub mod host;
pub mod ids;
pub mod registry;
pub mod room;
pub mod score;
pub mod view;

use crate::config::ServerConfig;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::types::*;
use registry::{Envelope, RoomRegistry};
use room::Room;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};

/// Messages queued per connection before new ones are dropped
pub const OUTBOX_CAPACITY: usize = 100;

/// Outbound channel of one connection
pub type Outbox = mpsc::Sender<ServerMessage>;

/// Shared application state
///
/// One lock guards the whole registry, so every command and disconnect is
/// applied to completion before the next one starts.
pub struct AppState {
    pub config: Arc<ServerConfig>,
    registry: Mutex<RoomRegistry>,
    outboxes: RwLock<HashMap<ConnectionId, Outbox>>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let registry = RoomRegistry::new(config.room.clone());
        Self::with_registry(config, registry)
    }

    /// Build around a prepared registry (e.g. a seeded one in tests)
    pub fn with_registry(config: ServerConfig, registry: RoomRegistry) -> Self {
        Self {
            config: Arc::new(config),
            registry: Mutex::new(registry),
            outboxes: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection and hand back its id and message stream
    pub async fn connect(&self) -> (ConnectionId, mpsc::Receiver<ServerMessage>) {
        let connection_id = ulid::Ulid::new().to_string();
        let (tx, rx) = mpsc::channel(OUTBOX_CAPACITY);
        self.outboxes
            .write()
            .await
            .insert(connection_id.clone(), tx);
        tracing::debug!("Connection {} opened", connection_id);
        (connection_id, rx)
    }

    /// Apply one inbound command and deliver the resulting messages
    pub async fn handle_message(&self, connection_id: &str, msg: ClientMessage) {
        let mut registry = self.registry.lock().await;
        let envelopes = registry.handle(connection_id, msg);
        // Deliver while still holding the registry so per-connection order matches apply order
        self.deliver(envelopes).await;
    }

    /// Tear down a closed connection, leaving its room if it had joined one
    pub async fn disconnect(&self, connection_id: &str) {
        let mut registry = self.registry.lock().await;
        let envelopes = registry.disconnect(connection_id);
        self.outboxes.write().await.remove(connection_id);
        self.deliver(envelopes).await;
        tracing::debug!("Connection {} closed", connection_id);
    }

    /// Best-effort delivery; closed connections are skipped and a full
    /// outbox drops the message
    async fn deliver(&self, envelopes: Vec<Envelope>) {
        if envelopes.is_empty() {
            return;
        }
        let outboxes = self.outboxes.read().await;
        for envelope in envelopes {
            let Some(tx) = outboxes.get(&envelope.connection_id) else {
                continue;
            };
            match tx.try_send(envelope.message) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(
                        "Outbox of {} is full, dropping message",
                        envelope.connection_id
                    );
                }
                // Receiver gone means the socket is closing
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }
    }

    pub async fn room_count(&self) -> usize {
        self.registry.lock().await.room_count()
    }

    pub async fn connection_count(&self) -> usize {
        self.outboxes.read().await.len()
    }

    /// Run a read-only closure against a room, if it exists
    pub async fn with_room<T>(&self, code: &str, f: impl FnOnce(&Room) -> T) -> Option<T> {
        let registry = self.registry.lock().await;
        let code = registry.normalize_room_code(code)?;
        registry.room(&code).map(f)
    }

    /// Participant id of a joined connection
    pub async fn participant_id(&self, connection_id: &str) -> Option<ParticipantId> {
        self.registry
            .lock()
            .await
            .session(connection_id)
            .map(|s| s.participant_id.clone())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}
