use crate::connection::{ConnectionId, ConnectionRegistry, DeliveryOutcome, RecipientId};
use crate::message::Payload;
use axum::extract::ws::Message;
use log::*;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Facade over the connection registry. One instance lives in the
/// application state for the process lifetime; nothing here is global.
pub struct Manager {
    registry: Arc<ConnectionRegistry>,
}

impl Manager {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new()),
        }
    }

    /// Register a new connection and return its unique ID
    pub fn register_connection(
        &self,
        recipient_id: RecipientId,
        sender: UnboundedSender<Message>,
    ) -> ConnectionId {
        let connection_id = self.registry.register(recipient_id, sender);
        info!("Registered new WebSocket connection");
        connection_id
    }

    /// Unregister a connection by recipient and connection ID
    pub fn unregister_connection(&self, recipient_id: &str, connection_id: &ConnectionId) {
        info!("Unregistering WebSocket connection");
        self.registry.unregister(recipient_id, connection_id);
    }

    /// Best-effort push to one recipient. The returned outcome carries no
    /// obligation: callers log it (or not) and move on.
    pub fn push(&self, recipient_id: &str, payload: &Payload) -> DeliveryOutcome {
        let outcome = self.registry.push(recipient_id, payload);
        debug!(
            "Push of {} to recipient {recipient_id}: {outcome:?}",
            payload.kind()
        );
        outcome
    }

    /// Close every live connection with the server-shutdown code. Called
    /// once during orderly termination, never on the request path.
    pub fn shutdown(&self) {
        info!(
            "Shutting down {} WebSocket connection(s)",
            self.registry.connected_count()
        );
        self.registry.shutdown();
    }

    pub fn connected_count(&self) -> usize {
        self.registry.connected_count()
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}
