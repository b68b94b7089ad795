use super::error::Error;
use chrono::Utc;
use entity::messages::{ActiveModel, Column, Entity, Model};
use entity::Id;
use log::*;
use sea_orm::{entity::prelude::*, Condition, ConnectionTrait, QueryOrder, Set};

pub async fn create(
    db: &impl ConnectionTrait,
    message_model: Model,
    sender_id: Id,
) -> Result<Model, Error> {
    debug!(
        "New Message Model to be inserted from sender {sender_id} to {}",
        message_model.recipient_id
    );

    let now = Utc::now();
    let message_active_model: ActiveModel = ActiveModel {
        sender_id: Set(sender_id),
        recipient_id: Set(message_model.recipient_id),
        body: Set(message_model.body),
        is_read: Set(false),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    };

    Ok(message_active_model.insert(db).await?)
}

/// Both directions of the conversation between two users, oldest first.
pub async fn find_conversation(
    db: &impl ConnectionTrait,
    user_id: Id,
    other_user_id: Id,
) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(
            Condition::any()
                .add(
                    Condition::all()
                        .add(Column::SenderId.eq(user_id))
                        .add(Column::RecipientId.eq(other_user_id)),
                )
                .add(
                    Condition::all()
                        .add(Column::SenderId.eq(other_user_id))
                        .add(Column::RecipientId.eq(user_id)),
                ),
        )
        .order_by_asc(Column::CreatedAt)
        .all(db)
        .await?)
}
