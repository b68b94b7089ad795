//! SeaORM Entity for the notifications table.
//!
//! A notification row is the durable record behind the live push: it is
//! inserted before any delivery attempt and remains the source of truth
//! when the recipient was offline for the push.

use crate::notification_kind::NotificationKind;
use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::notifications::Model)]
#[sea_orm(schema_name = "agora_platform", table_name = "notifications")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    pub id: Id,

    /// The user this notification is for
    pub recipient_id: Id,

    /// The user whose action triggered it; null for system notifications
    pub actor_id: Option<Id>,

    pub kind: NotificationKind,

    /// Post the notification refers to, when applicable
    pub post_id: Option<Id>,

    /// Comment the notification refers to, when applicable
    pub comment_id: Option<Id>,

    /// Short human-readable line shown in the notification list
    pub content: String,

    pub is_read: bool,

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
        belongs_to = "super::users::Entity",
        from = "Column::RecipientId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Recipient,

    #[sea_orm(
        belongs_to = "super::posts::Entity",
        from = "Column::PostId",
        to = "super::posts::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Posts,

    #[sea_orm(
        belongs_to = "super::comments::Entity",
        from = "Column::CommentId",
        to = "super::comments::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Comments,
}

impl ActiveModelBehavior for ActiveModel {}
