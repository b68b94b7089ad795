use super::error::{EntityApiErrorKind, Error};
use chrono::Utc;
use entity::posts::{ActiveModel, Column, Entity, Model};
use entity::Id;
use log::*;
use sea_orm::{entity::prelude::*, ConnectionTrait, QueryOrder, Set};

pub async fn create(
    db: &impl ConnectionTrait,
    post_model: Model,
    user_id: Id,
) -> Result<Model, Error> {
    debug!("New Post Model to be inserted: {post_model:?}");

    let now = Utc::now();
    let post_active_model: ActiveModel = ActiveModel {
        subtable_id: Set(post_model.subtable_id),
        user_id: Set(user_id),
        title: Set(post_model.title),
        body: Set(post_model.body),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    };

    Ok(post_active_model.insert(db).await?)
}

pub async fn find_by_id(db: &impl ConnectionTrait, id: Id) -> Result<Model, Error> {
    match Entity::find_by_id(id).one(db).await? {
        Some(post) => Ok(post),
        None => Err(Error {
            source: None,
            error_kind: EntityApiErrorKind::RecordNotFound,
        }),
    }
}

pub async fn find_by_subtable(db: &impl ConnectionTrait, subtable_id: Id) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::SubtableId.eq(subtable_id))
        .order_by_desc(Column::CreatedAt)
        .all(db)
        .await?)
}
