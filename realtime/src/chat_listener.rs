use crate::manager::Manager;
use crate::message::Payload;
use async_trait::async_trait;
use events::{DomainEvent, EventHandler, HandlerError};
use log::*;
use std::sync::Arc;

/// Pushes direct messages to the recipient's live connection.
///
/// The message row is already durable by the time the event is published,
/// so this handler is pure translation: no storage, no retries. An offline
/// recipient sees the message in the conversation fetch instead.
pub struct ChatEventHandler {
    manager: Arc<Manager>,
}

impl ChatEventHandler {
    pub fn new(manager: Arc<Manager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl EventHandler for ChatEventHandler {
    async fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError> {
        match event {
            DomainEvent::MessageSent {
                message,
                sender_id,
                recipient_id,
            } => {
                debug!("Handling MessageSent event from {sender_id} to {recipient_id}");

                let payload = Payload::NewChatMessage {
                    message: message.clone(),
                };
                let _ = self.manager.push(&recipient_id.to_string(), &payload);

                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entity::Id;
    use serde_json::json;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn message_sent_is_pushed_to_the_recipient_only() {
        let manager = Arc::new(Manager::new());
        let recipient_id = Id::new_v4();
        let bystander_id = Id::new_v4();

        let (tx_r, mut rx_r) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        manager.register_connection(recipient_id.to_string(), tx_r);
        manager.register_connection(bystander_id.to_string(), tx_b);

        let handler = ChatEventHandler::new(manager);
        handler
            .handle(&DomainEvent::MessageSent {
                message: json!({"id": Id::new_v4(), "body": "hello there"}),
                sender_id: Id::new_v4(),
                recipient_id,
            })
            .await
            .unwrap();

        let frame = rx_r.try_recv().expect("recipient should get the push");
        match frame {
            axum::extract::ws::Message::Text(text) => {
                let value: serde_json::Value = serde_json::from_str(&text).unwrap();
                assert_eq!(value["type"], "NEW_CHAT_MESSAGE");
                assert_eq!(value["message"]["body"], "hello there");
            }
            other => panic!("expected text frame, got {other:?}"),
        }
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn offline_recipient_is_not_an_error() {
        let handler = ChatEventHandler::new(Arc::new(Manager::new()));

        handler
            .handle(&DomainEvent::MessageSent {
                message: json!({"body": "into the void"}),
                sender_id: Id::new_v4(),
                recipient_id: Id::new_v4(),
            })
            .await
            .unwrap();
    }
}
