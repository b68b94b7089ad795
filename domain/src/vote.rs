use crate::error::Error;
use crate::votes::Model;
use crate::Id;
use events::{DomainEvent, EventBus};
use sea_orm::DatabaseConnection;

pub use entity_api::vote::score;

/// Cast or change a vote on a post. `value` must be +1 or -1.
pub async fn cast(
    db: &DatabaseConnection,
    bus: &EventBus,
    user_id: Id,
    post_id: Id,
    value: i16,
) -> Result<Model, Error> {
    if value != 1 && value != -1 {
        return Err(Error::invalid());
    }

    let vote = entity_api::vote::upsert(db, user_id, post_id, value).await?;

    bus.publish(DomainEvent::VoteCast {
        post_id,
        voter_id: user_id,
        value,
    })
    .await;

    Ok(vote)
}
