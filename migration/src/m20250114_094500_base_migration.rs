use sea_orm_migration::prelude::extension::postgres::Type;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

fn uuid_pk(name: impl IntoIden) -> ColumnDef {
    let mut column = ColumnDef::new(name);
    column
        .uuid()
        .not_null()
        .primary_key()
        .default(Expr::cust("gen_random_uuid()"));
    column
}

fn timestamptz(name: impl IntoIden) -> ColumnDef {
    let mut column = ColumnDef::new(name);
    column
        .timestamp_with_time_zone()
        .not_null()
        .default(Expr::current_timestamp());
    column
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // All platform tables live in the agora_platform schema.
        manager
            .get_connection()
            .execute_unprepared("SET search_path TO agora_platform, public;")
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .col(uuid_pk(Users::Id))
                    .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .col(ColumnDef::new(Users::DisplayName).string())
                    .col(ColumnDef::new(Users::About).text())
                    .col(timestamptz(Users::CreatedAt))
                    .col(timestamptz(Users::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Subtables::Table)
                    .col(uuid_pk(Subtables::Id))
                    .col(
                        ColumnDef::new(Subtables::Name)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Subtables::Description).text())
                    .col(ColumnDef::new(Subtables::CreatorId).uuid().not_null())
                    .col(timestamptz(Subtables::CreatedAt))
                    .col(timestamptz(Subtables::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subtables_creator_id")
                            .from(Subtables::Table, Subtables::CreatorId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Posts::Table)
                    .col(uuid_pk(Posts::Id))
                    .col(ColumnDef::new(Posts::SubtableId).uuid().not_null())
                    .col(ColumnDef::new(Posts::UserId).uuid().not_null())
                    .col(ColumnDef::new(Posts::Title).string().not_null())
                    .col(ColumnDef::new(Posts::Body).text())
                    .col(timestamptz(Posts::CreatedAt))
                    .col(timestamptz(Posts::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_posts_subtable_id")
                            .from(Posts::Table, Posts::SubtableId)
                            .to(Subtables::Table, Subtables::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_posts_user_id")
                            .from(Posts::Table, Posts::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_posts_subtable_id_created_at")
                    .table(Posts::Table)
                    .col(Posts::SubtableId)
                    .col(Posts::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Comments::Table)
                    .col(uuid_pk(Comments::Id))
                    .col(ColumnDef::new(Comments::PostId).uuid().not_null())
                    .col(ColumnDef::new(Comments::UserId).uuid().not_null())
                    .col(ColumnDef::new(Comments::ParentCommentId).uuid())
                    .col(ColumnDef::new(Comments::Body).text().not_null())
                    .col(timestamptz(Comments::CreatedAt))
                    .col(timestamptz(Comments::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comments_post_id")
                            .from(Comments::Table, Comments::PostId)
                            .to(Posts::Table, Posts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comments_user_id")
                            .from(Comments::Table, Comments::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comments_parent_comment_id")
                            .from(Comments::Table, Comments::ParentCommentId)
                            .to(Comments::Table, Comments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_comments_post_id_created_at")
                    .table(Comments::Table)
                    .col(Comments::PostId)
                    .col(Comments::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Votes::Table)
                    .col(uuid_pk(Votes::Id))
                    .col(ColumnDef::new(Votes::UserId).uuid().not_null())
                    .col(ColumnDef::new(Votes::PostId).uuid().not_null())
                    .col(ColumnDef::new(Votes::Value).small_integer().not_null())
                    .col(timestamptz(Votes::CreatedAt))
                    .col(timestamptz(Votes::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_votes_user_id")
                            .from(Votes::Table, Votes::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_votes_post_id")
                            .from(Votes::Table, Votes::PostId)
                            .to(Posts::Table, Posts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One vote per user per post
        manager
            .create_index(
                Index::create()
                    .name("idx_votes_user_id_post_id")
                    .table(Votes::Table)
                    .col(Votes::UserId)
                    .col(Votes::PostId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Messages::Table)
                    .col(uuid_pk(Messages::Id))
                    .col(ColumnDef::new(Messages::SenderId).uuid().not_null())
                    .col(ColumnDef::new(Messages::RecipientId).uuid().not_null())
                    .col(ColumnDef::new(Messages::Body).text().not_null())
                    .col(
                        ColumnDef::new(Messages::IsRead)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(timestamptz(Messages::CreatedAt))
                    .col(timestamptz(Messages::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_messages_sender_id")
                            .from(Messages::Table, Messages::SenderId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_messages_recipient_id")
                            .from(Messages::Table, Messages::RecipientId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_messages_recipient_id_created_at")
                    .table(Messages::Table)
                    .col(Messages::RecipientId)
                    .col(Messages::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(NotificationKind::Table)
                    .values([
                        NotificationKind::CommentReply,
                        NotificationKind::PostReply,
                        NotificationKind::Mention,
                        NotificationKind::Message,
                        NotificationKind::ModeratorInvite,
                        NotificationKind::SystemMessage,
                        NotificationKind::ReportUpdate,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Notifications::Table)
                    .col(uuid_pk(Notifications::Id))
                    .col(ColumnDef::new(Notifications::RecipientId).uuid().not_null())
                    .col(ColumnDef::new(Notifications::ActorId).uuid())
                    .col(
                        ColumnDef::new(Notifications::Kind)
                            .custom(NotificationKind::Table)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Notifications::PostId).uuid())
                    .col(ColumnDef::new(Notifications::CommentId).uuid())
                    .col(ColumnDef::new(Notifications::Content).text().not_null())
                    .col(
                        ColumnDef::new(Notifications::IsRead)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(timestamptz(Notifications::CreatedAt))
                    .col(timestamptz(Notifications::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notifications_recipient_id")
                            .from(Notifications::Table, Notifications::RecipientId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notifications_post_id")
                            .from(Notifications::Table, Notifications::PostId)
                            .to(Posts::Table, Posts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notifications_comment_id")
                            .from(Notifications::Table, Notifications::CommentId)
                            .to(Comments::Table, Comments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // The unread-count and list queries both filter on these.
        manager
            .create_index(
                Index::create()
                    .name("idx_notifications_recipient_id_is_read")
                    .table(Notifications::Table)
                    .col(Notifications::RecipientId)
                    .col(Notifications::IsRead)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("SET search_path TO agora_platform, public;")
            .await?;

        for table in [
            Notifications::Table.into_iden(),
            Messages::Table.into_iden(),
            Votes::Table.into_iden(),
            Comments::Table.into_iden(),
            Posts::Table.into_iden(),
            Subtables::Table.into_iden(),
            Users::Table.into_iden(),
        ] {
            manager
                .drop_table(Table::drop().table(table).to_owned())
                .await?;
        }

        manager
            .drop_type(Type::drop().name(NotificationKind::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    Username,
    Password,
    DisplayName,
    About,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Subtables {
    Table,
    Id,
    Name,
    Description,
    CreatorId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Posts {
    Table,
    Id,
    SubtableId,
    UserId,
    Title,
    Body,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Comments {
    Table,
    Id,
    PostId,
    UserId,
    ParentCommentId,
    Body,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Votes {
    Table,
    Id,
    UserId,
    PostId,
    Value,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Messages {
    Table,
    Id,
    SenderId,
    RecipientId,
    Body,
    IsRead,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum NotificationKind {
    #[sea_orm(iden = "notification_kind")]
    Table,
    CommentReply,
    PostReply,
    Mention,
    Message,
    ModeratorInvite,
    SystemMessage,
    ReportUpdate,
}

#[derive(DeriveIden)]
enum Notifications {
    Table,
    Id,
    RecipientId,
    ActorId,
    Kind,
    PostId,
    CommentId,
    Content,
    IsRead,
    CreatedAt,
    UpdatedAt,
}
