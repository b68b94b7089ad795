use crate::error::Error;
use crate::messages::Model;
use crate::Id;
use events::{DomainEvent, EventBus};
use log::*;
use sea_orm::DatabaseConnection;

pub use entity_api::message::find_conversation;

/// Record a direct message and announce it for live delivery. The row is
/// durable before the event goes out; an offline recipient reads it from
/// the conversation instead of the push.
pub async fn send(
    db: &DatabaseConnection,
    bus: &EventBus,
    message_model: Model,
    sender_id: Id,
) -> Result<Model, Error> {
    let message = entity_api::message::create(db, message_model, sender_id).await?;

    match serde_json::to_value(&message) {
        Ok(message_json) => {
            bus.publish(DomainEvent::MessageSent {
                message: message_json,
                sender_id,
                recipient_id: message.recipient_id,
            })
            .await;
        }
        Err(e) => error!("Failed to serialize message {} for publish: {e}", message.id),
    }

    Ok(message)
}
