use crate::comments::Model;
use crate::error::Error;
use crate::Id;
use events::{DomainEvent, EventBus};
use log::*;
use sea_orm::DatabaseConnection;

pub use entity_api::comment::{find_by_id, find_by_post};

/// Create a comment and announce it on the event bus.
///
/// The insert commits before the event is published, so a listener can
/// never observe an unpersisted comment. A publish-side problem (including
/// the unlikely failure to serialize the freshly inserted row) is logged
/// and swallowed: the comment exists, and that is what the caller is told.
pub async fn create(
    db: &DatabaseConnection,
    bus: &EventBus,
    comment_model: Model,
    user_id: Id,
) -> Result<Model, Error> {
    let comment = entity_api::comment::create(db, comment_model, user_id).await?;

    match serde_json::to_value(&comment) {
        Ok(comment_json) => {
            bus.publish(DomainEvent::CommentCreated {
                comment: comment_json,
                commenter_id: user_id,
            })
            .await;
        }
        Err(e) => error!("Failed to serialize comment {} for publish: {e}", comment.id),
    }

    Ok(comment)
}
