use super::error::{EntityApiErrorKind, Error};
use chrono::Utc;
use entity::comments::{ActiveModel, Column, Entity, Model};
use entity::Id;
use log::*;
use sea_orm::{entity::prelude::*, ConnectionTrait, QueryOrder, Set};

pub async fn create(
    db: &impl ConnectionTrait,
    comment_model: Model,
    user_id: Id,
) -> Result<Model, Error> {
    debug!("New Comment Model to be inserted: {comment_model:?}");

    let now = Utc::now();
    let comment_active_model: ActiveModel = ActiveModel {
        post_id: Set(comment_model.post_id),
        user_id: Set(user_id),
        parent_comment_id: Set(comment_model.parent_comment_id),
        body: Set(comment_model.body),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    };

    Ok(comment_active_model.insert(db).await?)
}

pub async fn find_by_id(db: &impl ConnectionTrait, id: Id) -> Result<Model, Error> {
    match Entity::find_by_id(id).one(db).await? {
        Some(comment) => Ok(comment),
        None => Err(Error {
            source: None,
            error_kind: EntityApiErrorKind::RecordNotFound,
        }),
    }
}

pub async fn find_by_post(db: &impl ConnectionTrait, post_id: Id) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::PostId.eq(post_id))
        .order_by_asc(Column::CreatedAt)
        .all(db)
        .await?)
}
