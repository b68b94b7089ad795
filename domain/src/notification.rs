use crate::error::Error;
use crate::notifications::Model;
use crate::Id;
use sea_orm::DatabaseConnection;

pub use entity_api::notification::NotificationFilters;

/// One page of a user's notification list plus the unpaginated total, used
/// to hydrate client state on page load or reconnect (the live channel
/// replays nothing).
#[derive(Debug)]
pub struct NotificationPage {
    pub notifications: Vec<Model>,
    pub total_count: u64,
}

pub async fn find_by_recipient(
    db: &DatabaseConnection,
    recipient_id: Id,
    filters: NotificationFilters,
) -> Result<NotificationPage, Error> {
    let notifications =
        entity_api::notification::find_by_recipient(db, recipient_id, filters).await?;
    let total_count =
        entity_api::notification::count_by_recipient(db, recipient_id, filters.is_read).await?;

    Ok(NotificationPage {
        notifications,
        total_count,
    })
}

pub async fn count_unread(db: &DatabaseConnection, recipient_id: Id) -> Result<u64, Error> {
    Ok(entity_api::notification::count_by_recipient(db, recipient_id, Some(false)).await?)
}

pub async fn mark_read(
    db: &DatabaseConnection,
    id: Id,
    recipient_id: Id,
) -> Result<Model, Error> {
    Ok(entity_api::notification::mark_read(db, id, recipient_id).await?)
}
