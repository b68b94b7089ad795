//! SeaORM Entity for the users table.

use crate::Id;
use axum_login::AuthUser;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::users::Model)]
#[sea_orm(schema_name = "agora_platform", table_name = "users")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    pub id: Id,

    #[sea_orm(unique)]
    pub email: String,

    /// Public handle shown next to posts and comments
    #[sea_orm(unique)]
    pub username: String,

    /// Password hash; accepted on signup, never serialized back out
    #[serde(skip_serializing)]
    pub password: String,

    pub display_name: Option<String>,

    pub about: Option<String>,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::posts::Entity")]
    Posts,

    #[sea_orm(has_many = "super::comments::Entity")]
    Comments,
}

impl Related<super::posts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Posts.def()
    }
}

impl Related<super::comments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl AuthUser for Model {
    type Id = Id;

    fn id(&self) -> Self::Id {
        self.id
    }

    // Changing the password hash invalidates every live session for the user.
    fn session_auth_hash(&self) -> &[u8] {
        self.password.as_bytes()
    }
}
