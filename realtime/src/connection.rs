use crate::message::Payload;
use axum::extract::ws::{CloseFrame, Message};
use dashmap::DashMap;
use log::*;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

// Type alias for user IDs (the web layer converts entity::Id to String)
pub type RecipientId = String;

/// Application close code sent to a connection that was replaced by a newer
/// one for the same user. In the reserved range, so clients treat it as
/// final and do not reconnect the stale tab into a takeover loop.
pub const CLOSE_SUPERSEDED: u16 = 4000;

/// Application close code sent to every connection during orderly process
/// shutdown.
pub const CLOSE_SERVER_SHUTDOWN: u16 = 4001;

/// Unique identifier for a connection (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Open = 0,
    Closing = 1,
    Closed = 2,
}

impl ConnectionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => ConnectionState::Open,
            1 => ConnectionState::Closing,
            _ => ConnectionState::Closed,
        }
    }
}

/// What became of a single push attempt. Deliberately not a `Result`: the
/// caller is a domain listener that must not fail because delivery did, so
/// the outcome is an ordinary value it can log and drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    RecipientOffline,
    ConnectionNotOpen,
    SendFailed,
    SerializeFailed,
}

/// One live connection. The registry owns the handle; the socket task owns
/// the receiving end of the channel and performs the actual writes.
pub struct ConnectionHandle {
    id: ConnectionId,
    sender: UnboundedSender<Message>,
    state: AtomicU8,
}

impl ConnectionHandle {
    fn new(sender: UnboundedSender<Message>) -> Self {
        Self {
            id: ConnectionId::new(),
            sender,
            state: AtomicU8::new(ConnectionState::Open as u8),
        }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Single source of truth for "is user X currently reachable, and how".
///
/// At most one connection per recipient at any instant; registering a
/// second one replaces (and force-closes) the first. All operations are
/// fire-and-forget from the caller's perspective: nothing here panics,
/// propagates, or blocks on network I/O.
pub struct ConnectionRegistry {
    connections: DashMap<RecipientId, Arc<ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Register a connection for a recipient, taking over from any prior
    /// one. The superseded connection is sent a close frame so it cannot
    /// keep receiving alongside its replacement; its own cleanup then runs
    /// `unregister` with a connection id that no longer matches, which is a
    /// no-op.
    pub fn register(
        &self,
        recipient_id: RecipientId,
        sender: UnboundedSender<Message>,
    ) -> ConnectionId {
        let handle = Arc::new(ConnectionHandle::new(sender));
        let connection_id = handle.id.clone();

        if let Some(previous) = self.connections.insert(recipient_id.clone(), handle) {
            debug!(
                "Connection takeover for recipient {recipient_id}: closing {}",
                previous.id.as_str()
            );
            previous.set_state(ConnectionState::Closing);
            let _ = previous.sender.send(Message::Close(Some(CloseFrame {
                code: CLOSE_SUPERSEDED,
                reason: "superseded by a newer connection".into(),
            })));
        }

        connection_id
    }

    /// Remove the mapping for a recipient, but only if it still refers to
    /// the given connection. Idempotent; unregistering an absent or already
    /// replaced connection does nothing.
    pub fn unregister(&self, recipient_id: &str, connection_id: &ConnectionId) {
        let removed = self
            .connections
            .remove_if(recipient_id, |_, handle| handle.id == *connection_id);

        if let Some((_, handle)) = removed {
            handle.set_state(ConnectionState::Closed);
        }
    }

    /// Attempt to deliver a payload to a recipient's live connection.
    /// Absent or non-open connections drop the payload; a send failure
    /// unregisters the half-dead connection so the map never holds a stale
    /// handle.
    pub fn push(&self, recipient_id: &str, payload: &Payload) -> DeliveryOutcome {
        // Clone the handle out so no map guard is held while sending or
        // unregistering.
        let handle = match self.connections.get(recipient_id) {
            Some(entry) => entry.value().clone(),
            None => {
                debug!(
                    "Dropping {} push: recipient {recipient_id} not connected",
                    payload.kind()
                );
                return DeliveryOutcome::RecipientOffline;
            }
        };

        if handle.state() != ConnectionState::Open {
            debug!(
                "Dropping {} push: connection {} for recipient {recipient_id} is not open",
                payload.kind(),
                handle.id.as_str()
            );
            return DeliveryOutcome::ConnectionNotOpen;
        }

        let text = match serde_json::to_string(payload) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize {} payload: {e}", payload.kind());
                return DeliveryOutcome::SerializeFailed;
            }
        };

        if handle.sender.send(Message::Text(text)).is_err() {
            warn!(
                "Failed to send {} to connection {} for recipient {recipient_id}. \
                 Connection will be cleaned up.",
                payload.kind(),
                handle.id.as_str()
            );
            handle.set_state(ConnectionState::Closed);
            self.unregister(recipient_id, &handle.id);
            return DeliveryOutcome::SendFailed;
        }

        DeliveryOutcome::Delivered
    }

    /// Close every connection with a "server shutting down" code and clear
    /// the map. Only called during orderly process termination.
    pub fn shutdown(&self) {
        let handles: Vec<(RecipientId, Arc<ConnectionHandle>)> = self
            .connections
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        self.connections.clear();

        for (recipient_id, handle) in handles {
            handle.set_state(ConnectionState::Closing);
            if handle
                .sender
                .send(Message::Close(Some(CloseFrame {
                    code: CLOSE_SERVER_SHUTDOWN,
                    reason: "server shutting down".into(),
                })))
                .is_err()
            {
                debug!("Connection for recipient {recipient_id} already gone during shutdown");
            }
        }
    }

    pub fn connected_count(&self) -> usize {
        self.connections.len()
    }

    #[cfg(test)]
    pub(crate) fn handle(&self, recipient_id: &str) -> Option<Arc<ConnectionHandle>> {
        self.connections
            .get(recipient_id)
            .map(|entry| entry.value().clone())
    }

    #[cfg(test)]
    pub(crate) fn set_state(&self, recipient_id: &str, state: ConnectionState) {
        if let Some(handle) = self.handle(recipient_id) {
            handle.set_state(state);
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn payload() -> Payload {
        Payload::NewChatMessage {
            message: json!({"body": "hello"}),
        }
    }

    fn expect_text(message: Message) -> String {
        match message {
            Message::Text(text) => text,
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn register_replaces_and_force_closes_previous_connection() {
        let registry = ConnectionRegistry::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();

        registry.register("u1".to_string(), tx_a);
        registry.register("u1".to_string(), tx_b);

        // The superseded connection got a final close frame.
        match rx_a.recv().await {
            Some(Message::Close(Some(frame))) => assert_eq!(frame.code, CLOSE_SUPERSEDED),
            other => panic!("expected close frame on old connection, got {other:?}"),
        }

        // Only the new connection is reachable.
        assert_eq!(registry.push("u1", &payload()), DeliveryOutcome::Delivered);
        let text = expect_text(rx_b.recv().await.unwrap());
        assert!(text.contains("NEW_CHAT_MESSAGE"));
        assert!(rx_a.try_recv().is_err());
        assert_eq!(registry.connected_count(), 1);
    }

    #[tokio::test]
    async fn stale_unregister_does_not_evict_replacement() {
        let registry = ConnectionRegistry::new();
        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();

        let old_id = registry.register("u1".to_string(), tx_a);
        registry.register("u1".to_string(), tx_b);

        // The replaced connection's deferred cleanup fires late.
        registry.unregister("u1", &old_id);

        assert_eq!(registry.push("u1", &payload()), DeliveryOutcome::Delivered);
        assert!(rx_b.recv().await.is_some());
    }

    #[test]
    fn unregister_is_idempotent_and_tolerates_absent_recipients() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let id = registry.register("u1".to_string(), tx);
        registry.unregister("u1", &id);
        registry.unregister("u1", &id);
        registry.unregister("nobody", &ConnectionId::new());

        assert_eq!(registry.connected_count(), 0);
    }

    #[test]
    fn push_to_unknown_recipient_is_dropped() {
        let registry = ConnectionRegistry::new();

        assert_eq!(
            registry.push("nobody", &payload()),
            DeliveryOutcome::RecipientOffline
        );
    }

    #[test]
    fn push_to_non_open_connection_is_dropped() {
        let registry = ConnectionRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        registry.register("u1".to_string(), tx);
        registry.set_state("u1", ConnectionState::Closing);

        assert_eq!(
            registry.push("u1", &payload()),
            DeliveryOutcome::ConnectionNotOpen
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_failure_unregisters_the_connection() {
        let registry = ConnectionRegistry::new();
        let (tx, rx) = mpsc::unbounded_channel();

        registry.register("u1".to_string(), tx);
        drop(rx); // half-dead socket: channel receiver gone

        assert_eq!(registry.push("u1", &payload()), DeliveryOutcome::SendFailed);
        assert_eq!(registry.connected_count(), 0);
        assert_eq!(
            registry.push("u1", &payload()),
            DeliveryOutcome::RecipientOffline
        );
    }

    #[tokio::test]
    async fn shutdown_closes_everything_and_clears_the_map() {
        let registry = ConnectionRegistry::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();

        registry.register("u1".to_string(), tx_a);
        registry.register("u2".to_string(), tx_b);

        registry.shutdown();

        for rx in [&mut rx_a, &mut rx_b] {
            match rx.recv().await {
                Some(Message::Close(Some(frame))) => {
                    assert_eq!(frame.code, CLOSE_SERVER_SHUTDOWN)
                }
                other => panic!("expected shutdown close frame, got {other:?}"),
            }
        }

        assert_eq!(registry.connected_count(), 0);
        assert_eq!(
            registry.push("u1", &payload()),
            DeliveryOutcome::RecipientOffline
        );
    }
}
