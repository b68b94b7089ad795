use crate::manager::Manager;
use crate::message::Payload;
use async_trait::async_trait;
use entity::notification_kind::NotificationKind;
use entity::notifications;
use entity::Id;
use entity_api::error::EntityApiErrorKind;
use entity_api::notification::NewNotification;
use entity_api::{notification, post, user};
use events::{DomainEvent, EventHandler, HandlerError};
use log::*;
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// The fields of the comment payload this listener actually needs. The
/// event carries the full serialized entity; deserializing a projection
/// keeps the listener indifferent to the rest of its shape.
#[derive(Debug, Deserialize)]
pub(crate) struct CommentRef {
    pub id: Id,
    pub post_id: Id,
    pub parent_comment_id: Option<Id>,
}

/// Turns a committed comment into a durable notification for the post
/// author plus a best-effort live push.
///
/// Everything in here runs after the comment itself has committed and
/// returned success to its caller, so no failure on this path may surface
/// beyond a log line: the worst case is always "no notification sent".
pub struct CommentEventHandler {
    db: Arc<DatabaseConnection>,
    manager: Arc<Manager>,
}

impl CommentEventHandler {
    pub fn new(db: Arc<DatabaseConnection>, manager: Arc<Manager>) -> Self {
        Self { db, manager }
    }

    /// The notify-on-comment flow. Returns the persisted notification, or
    /// `None` when policy says there is nothing to notify (self-comment,
    /// post no longer resolvable).
    pub(crate) async fn notify_new_comment(
        &self,
        comment: &CommentRef,
        commenter_id: Id,
    ) -> Result<Option<notifications::Model>, HandlerError> {
        let db = self.db.as_ref();

        // The comment already committed; a dangling post reference is a
        // data inconsistency to log, not an error to raise.
        let post = match post::find_by_id(db, comment.post_id).await {
            Ok(post) => post,
            Err(e) if e.error_kind == EntityApiErrorKind::RecordNotFound => {
                warn!(
                    "Comment {} references missing post {}; skipping notification",
                    comment.id, comment.post_id
                );
                return Ok(None);
            }
            Err(e) => {
                return Err(HandlerError::with_source(
                    "failed to resolve post for comment notification",
                    e,
                ))
            }
        };

        // No self-notification.
        if post.user_id == commenter_id {
            debug!("Commenter {commenter_id} is the post author; no notification");
            return Ok(None);
        }

        // Attribution is nice to have; an unresolvable commenter is not a
        // reason to drop the notification.
        let commenter = user::find_by_id(db, commenter_id).await.ok();
        let commenter_name = commenter
            .as_ref()
            .map(|u| u.username.as_str())
            .unwrap_or("someone");

        let (kind, content) = if comment.parent_comment_id.is_some() {
            (
                NotificationKind::CommentReply,
                format!(
                    "{commenter_name} replied to your comment on \"{}\"",
                    post.title
                ),
            )
        } else {
            (
                NotificationKind::PostReply,
                format!("{commenter_name} commented on your post \"{}\"", post.title),
            )
        };

        let txn = self.db.begin().await.map_err(|e| {
            HandlerError::with_source("failed to open notification transaction", e)
        })?;

        let saved = notification::create(
            &txn,
            NewNotification {
                recipient_id: post.user_id,
                actor_id: commenter.as_ref().map(|u| u.id),
                kind,
                post_id: Some(post.id),
                comment_id: Some(comment.id),
                content,
            },
        )
        .await
        .map_err(|e| HandlerError::with_source("failed to insert notification", e))?;

        txn.commit()
            .await
            .map_err(|e| HandlerError::with_source("failed to commit notification", e))?;

        // The durable record is committed; from here on delivery is purely
        // additive and its outcome is deliberately discarded.
        match serde_json::to_value(&saved) {
            Ok(notification_json) => {
                let payload = Payload::NewCommentNotification {
                    notification: notification_json,
                };
                let _ = self.manager.push(&saved.recipient_id.to_string(), &payload);
            }
            Err(e) => error!("Failed to serialize notification {} for push: {e}", saved.id),
        }

        Ok(Some(saved))
    }

    fn parse_comment(value: &Value) -> Result<CommentRef, HandlerError> {
        serde_json::from_value(value.clone())
            .map_err(|e| HandlerError::with_source("malformed comment payload", e))
    }
}

#[async_trait]
impl EventHandler for CommentEventHandler {
    async fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError> {
        match event {
            DomainEvent::CommentCreated {
                comment,
                commenter_id,
            } => {
                let comment = Self::parse_comment(comment)?;
                self.notify_new_comment(&comment, *commenter_id).await?;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use chrono::Utc;
    use entity::{posts, users};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use serde_json::json;
    use tokio::sync::mpsc;

    fn post_by(author_id: Id) -> posts::Model {
        posts::Model {
            id: Id::new_v4(),
            subtable_id: Id::new_v4(),
            user_id: author_id,
            title: "On mock databases".to_string(),
            body: Some("a post body".to_string()),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn commenter(id: Id) -> users::Model {
        users::Model {
            id,
            email: "ada@example.com".to_string(),
            username: "ada".to_string(),
            password: "hash".to_string(),
            display_name: None,
            about: None,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn persisted_notification(recipient_id: Id, actor_id: Option<Id>) -> notifications::Model {
        notifications::Model {
            id: Id::new_v4(),
            recipient_id,
            actor_id,
            kind: NotificationKind::PostReply,
            post_id: Some(Id::new_v4()),
            comment_id: Some(Id::new_v4()),
            content: "ada commented on your post \"On mock databases\"".to_string(),
            is_read: false,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn comment_ref(post_id: Id, parent: Option<Id>) -> CommentRef {
        CommentRef {
            id: Id::new_v4(),
            post_id,
            parent_comment_id: parent,
        }
    }

    #[tokio::test]
    async fn comment_on_another_users_post_persists_then_pushes() {
        let author_id = Id::new_v4();
        let commenter_id = Id::new_v4();
        let post = post_by(author_id);
        let saved = persisted_notification(author_id, Some(commenter_id));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![post.clone()]])
            .append_query_results([vec![commenter(commenter_id)]])
            .append_query_results([vec![saved.clone()]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let manager = Arc::new(Manager::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        manager.register_connection(author_id.to_string(), tx);

        let handler = CommentEventHandler::new(Arc::new(db), manager);
        let result = handler
            .notify_new_comment(&comment_ref(post.id, None), commenter_id)
            .await
            .unwrap();

        // Exactly one durable notification, unread, for the post author.
        let notification = result.expect("notification should have been created");
        assert_eq!(notification.recipient_id, author_id);
        assert!(!notification.is_read);

        // Exactly one push attempt targeted the author, after the commit.
        let frame = rx.try_recv().expect("author should have received a push");
        let text = match frame {
            axum::extract::ws::Message::Text(text) => text,
            other => panic!("expected text frame, got {other:?}"),
        };
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "NEW_COMMENT_NOTIFICATION");
        assert_eq!(
            value["notification"]["recipient_id"],
            json!(author_id.to_string())
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn commenting_on_own_post_creates_nothing() {
        let author_id = Id::new_v4();
        let post = post_by(author_id);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![post.clone()]])
            .into_connection();

        let manager = Arc::new(Manager::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        manager.register_connection(author_id.to_string(), tx);

        let handler = CommentEventHandler::new(Arc::new(db), manager);
        let result = handler
            .notify_new_comment(&comment_ref(post.id, None), author_id)
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn missing_post_aborts_silently() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<posts::Model>::new()])
            .into_connection();

        let handler = CommentEventHandler::new(Arc::new(db), Arc::new(Manager::new()));
        let result = handler
            .notify_new_comment(&comment_ref(Id::new_v4(), None), Id::new_v4())
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn unresolvable_commenter_still_notifies_with_null_attribution() {
        let author_id = Id::new_v4();
        let post = post_by(author_id);
        let saved = persisted_notification(author_id, None);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![post.clone()]])
            .append_query_results([Vec::<users::Model>::new()])
            .append_query_results([vec![saved]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let handler = CommentEventHandler::new(Arc::new(db), Arc::new(Manager::new()));
        let result = handler
            .notify_new_comment(&comment_ref(post.id, Some(Id::new_v4())), Id::new_v4())
            .await
            .unwrap();

        let notification = result.expect("notification should still be created");
        assert_eq!(notification.actor_id, None);
    }

    #[test]
    fn malformed_comment_payload_is_rejected() {
        let result = CommentEventHandler::parse_comment(&json!({"body": "no ids here"}));
        assert!(result.is_err());
    }
}
