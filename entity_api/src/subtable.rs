use super::error::{EntityApiErrorKind, Error};
use chrono::Utc;
use entity::subtables::{ActiveModel, Column, Entity, Model};
use entity::Id;
use log::*;
use sea_orm::{entity::prelude::*, ConnectionTrait, QueryOrder, Set};

pub async fn create(
    db: &impl ConnectionTrait,
    subtable_model: Model,
    creator_id: Id,
) -> Result<Model, Error> {
    debug!("New Subtable Model to be inserted: {subtable_model:?}");

    let now = Utc::now();
    let subtable_active_model: ActiveModel = ActiveModel {
        name: Set(subtable_model.name),
        description: Set(subtable_model.description),
        creator_id: Set(creator_id),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    };

    Ok(subtable_active_model.insert(db).await?)
}

pub async fn find_by_id(db: &impl ConnectionTrait, id: Id) -> Result<Model, Error> {
    match Entity::find_by_id(id).one(db).await? {
        Some(subtable) => Ok(subtable),
        None => Err(Error {
            source: None,
            error_kind: EntityApiErrorKind::RecordNotFound,
        }),
    }
}

pub async fn find_all(db: &impl ConnectionTrait) -> Result<Vec<Model>, Error> {
    Ok(Entity::find().order_by_asc(Column::Name).all(db).await?)
}
