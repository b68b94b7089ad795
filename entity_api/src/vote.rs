use super::error::Error;
use chrono::Utc;
use entity::votes::{ActiveModel, Column, Entity, Model};
use entity::Id;
use log::*;
use sea_orm::{entity::prelude::*, ActiveValue::Unchanged, ConnectionTrait, Set};

/// Insert or update the caller's vote on a post. A user has at most one
/// vote row per post; casting again overwrites the value.
pub async fn upsert(
    db: &impl ConnectionTrait,
    user_id: Id,
    post_id: Id,
    value: i16,
) -> Result<Model, Error> {
    let now = Utc::now();

    let existing = Entity::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::PostId.eq(post_id))
        .one(db)
        .await?;

    match existing {
        Some(vote) => {
            debug!("Existing Vote model to be updated: {vote:?}");

            let active_model: ActiveModel = ActiveModel {
                id: Unchanged(vote.id),
                user_id: Unchanged(vote.user_id),
                post_id: Unchanged(vote.post_id),
                value: Set(value),
                created_at: Unchanged(vote.created_at),
                updated_at: Set(now.into()),
            };

            Ok(active_model.update(db).await?)
        }
        None => {
            let active_model: ActiveModel = ActiveModel {
                user_id: Set(user_id),
                post_id: Set(post_id),
                value: Set(value),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
                ..Default::default()
            };

            Ok(active_model.insert(db).await?)
        }
    }
}

/// Net score of a post: sum of vote values.
pub async fn score(db: &impl ConnectionTrait, post_id: Id) -> Result<i64, Error> {
    let votes = Entity::find()
        .filter(Column::PostId.eq(post_id))
        .all(db)
        .await?;

    Ok(votes.iter().map(|v| v.value as i64).sum())
}
