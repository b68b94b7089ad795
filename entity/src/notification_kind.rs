use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Eq, PartialEq, EnumIter, Deserialize, Serialize, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "notification_kind")]
pub enum NotificationKind {
    #[sea_orm(string_value = "comment_reply")]
    CommentReply,
    #[sea_orm(string_value = "post_reply")]
    PostReply,
    #[sea_orm(string_value = "mention")]
    Mention,
    #[sea_orm(string_value = "message")]
    Message,
    #[sea_orm(string_value = "moderator_invite")]
    ModeratorInvite,
    #[sea_orm(string_value = "system_message")]
    SystemMessage,
    #[sea_orm(string_value = "report_update")]
    ReportUpdate,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::CommentReply => write!(fmt, "comment_reply"),
            NotificationKind::PostReply => write!(fmt, "post_reply"),
            NotificationKind::Mention => write!(fmt, "mention"),
            NotificationKind::Message => write!(fmt, "message"),
            NotificationKind::ModeratorInvite => write!(fmt, "moderator_invite"),
            NotificationKind::SystemMessage => write!(fmt, "system_message"),
            NotificationKind::ReportUpdate => write!(fmt, "report_update"),
        }
    }
}
