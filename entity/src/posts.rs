//! SeaORM Entity for the posts table.

use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::posts::Model)]
#[sea_orm(schema_name = "agora_platform", table_name = "posts")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    pub id: Id,

    pub subtable_id: Id,

    /// Post author
    #[serde(skip_deserializing)]
    pub user_id: Id,

    pub title: String,

    pub body: Option<String>,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::subtables::Entity",
        from = "Column::SubtableId",
        to = "super::subtables::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Subtables,

    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,

    #[sea_orm(has_many = "super::comments::Entity")]
    Comments,

    #[sea_orm(has_many = "super::votes::Entity")]
    Votes,
}

impl Related<super::subtables::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subtables.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::comments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl Related<super::votes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Votes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
