use super::error::{EntityApiErrorKind, Error};
use chrono::Utc;
use entity::notifications::{ActiveModel, Column, Entity, Model};
use entity::Id;
use log::*;
use sea_orm::{
    entity::prelude::*,
    ActiveValue::{Set, Unchanged},
    ConnectionTrait, PaginatorTrait, QueryOrder, QuerySelect,
};

/// Read-state / pagination filters for the notification list.
/// Defaults fetch the first page of everything, newest first.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationFilters {
    pub is_read: Option<bool>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Everything needed to record a notification. The read flag and the
/// timestamps are owned by `create`, not the caller.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: Id,
    pub actor_id: Option<Id>,
    pub kind: entity::notification_kind::NotificationKind,
    pub post_id: Option<Id>,
    pub comment_id: Option<Id>,
    pub content: String,
}

/// Insert a notification record. Always created unread.
///
/// Takes `&impl ConnectionTrait` so the delivery layer can run the insert
/// inside its own transaction and only push after that commits.
pub async fn create(db: &impl ConnectionTrait, new: NewNotification) -> Result<Model, Error> {
    debug!(
        "New {} Notification to be inserted for recipient {}",
        new.kind, new.recipient_id
    );

    let now = Utc::now();
    let notification_active_model: ActiveModel = ActiveModel {
        recipient_id: Set(new.recipient_id),
        actor_id: Set(new.actor_id),
        kind: Set(new.kind),
        post_id: Set(new.post_id),
        comment_id: Set(new.comment_id),
        content: Set(new.content),
        is_read: Set(false),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    };

    Ok(notification_active_model.insert(db).await?)
}

pub async fn find_by_recipient(
    db: &impl ConnectionTrait,
    recipient_id: Id,
    filters: NotificationFilters,
) -> Result<Vec<Model>, Error> {
    let mut query = Entity::find()
        .filter(Column::RecipientId.eq(recipient_id))
        .order_by_desc(Column::CreatedAt);

    if let Some(is_read) = filters.is_read {
        query = query.filter(Column::IsRead.eq(is_read));
    }
    if let Some(limit) = filters.limit {
        query = query.limit(limit);
    }
    if let Some(offset) = filters.offset {
        query = query.offset(offset);
    }

    Ok(query.all(db).await?)
}

pub async fn count_by_recipient(
    db: &impl ConnectionTrait,
    recipient_id: Id,
    is_read: Option<bool>,
) -> Result<u64, Error> {
    let mut query = Entity::find().filter(Column::RecipientId.eq(recipient_id));

    if let Some(is_read) = is_read {
        query = query.filter(Column::IsRead.eq(is_read));
    }

    Ok(query.count(db).await?)
}

/// Flip a notification to read. Scoped to the recipient so a user can only
/// mark their own notifications.
pub async fn mark_read(
    db: &impl ConnectionTrait,
    id: Id,
    recipient_id: Id,
) -> Result<Model, Error> {
    let result = Entity::find_by_id(id)
        .filter(Column::RecipientId.eq(recipient_id))
        .one(db)
        .await?;

    match result {
        Some(notification) => {
            let active_model: ActiveModel = ActiveModel {
                id: Unchanged(notification.id),
                recipient_id: Unchanged(notification.recipient_id),
                actor_id: Unchanged(notification.actor_id),
                kind: Unchanged(notification.kind),
                post_id: Unchanged(notification.post_id),
                comment_id: Unchanged(notification.comment_id),
                content: Unchanged(notification.content),
                is_read: Set(true),
                created_at: Unchanged(notification.created_at),
                updated_at: Set(Utc::now().into()),
            };

            Ok(active_model.update(db).await?)
        }
        None => {
            error!("Notification with id {id} not found for recipient {recipient_id}");

            Err(Error {
                source: None,
                error_kind: EntityApiErrorKind::RecordNotFound,
            })
        }
    }
}

#[cfg(test)]
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use entity::notification_kind::NotificationKind;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};
    use std::collections::BTreeMap;

    fn unread_notification(recipient_id: Id) -> Model {
        Model {
            id: Id::new_v4(),
            recipient_id,
            actor_id: Some(Id::new_v4()),
            kind: NotificationKind::PostReply,
            post_id: Some(Id::new_v4()),
            comment_id: Some(Id::new_v4()),
            content: "ada replied to your post".to_string(),
            is_read: false,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn find_by_recipient_returns_rows() {
        let recipient_id = Id::new_v4();
        let expected = unread_notification(recipient_id);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![expected.clone()]])
            .into_connection();

        let found = find_by_recipient(
            &db,
            recipient_id,
            NotificationFilters {
                is_read: Some(false),
                limit: Some(10),
                offset: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(found, vec![expected]);
    }

    #[tokio::test]
    async fn count_by_recipient_reads_num_items() {
        let mut count_row = BTreeMap::<&str, Value>::new();
        count_row.insert("num_items", 3i64.into());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![count_row]])
            .into_connection();

        let count = count_by_recipient(&db, Id::new_v4(), Some(false))
            .await
            .unwrap();

        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn mark_read_rejects_unknown_notification() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<Model>::new()])
            .into_connection();

        let result = mark_read(&db, Id::new_v4(), Id::new_v4()).await;

        assert_eq!(
            result.unwrap_err().error_kind,
            EntityApiErrorKind::RecordNotFound
        );
    }
}
