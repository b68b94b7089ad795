//! Event system infrastructure for Agora.
//!
//! This crate provides the in-process event bus that enables loose coupling
//! between domain logic and infrastructure concerns (like WebSocket
//! delivery).
//!
//! # Architecture
//!
//! - **DomainEvent**: Enum representing all business events in the system
//! - **Topic**: The named channel a `DomainEvent` is published on
//! - **EventHandler**: Trait for implementing event handlers
//! - **EventBus**: Dispatches events to the handlers subscribed to a topic
//!
//! This crate has no dependencies on internal crates (entity, domain, etc.),
//! avoiding circular dependencies. Entity data is carried as serialized JSON
//! values.

use async_trait::async_trait;
use log::*;
use serde_json::Value;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// A type alias that represents any Entity's internal id field data type.
/// This matches the definition in the entity crate to maintain compatibility.
pub type Id = Uuid;

/// Named channels events are published on. Handlers subscribe to exactly
/// the topics they care about; a topic with no subscribers is valid and
/// publishing to it is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// A comment was durably created on a post.
    CommentCreated,
    /// A direct message was durably recorded between two users.
    MessageSent,
    /// A vote was durably cast or changed on a post.
    VoteCast,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::CommentCreated => "comment.created",
            Topic::MessageSent => "message.sent",
            Topic::VoteCast => "vote.cast",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Domain events that represent business-level changes in the system.
/// These events are emitted after the corresponding durable write has
/// already committed; a handler can therefore never observe an event for
/// state that does not exist.
///
/// Entity data is carried as `serde_json::Value` to avoid dependencies on
/// the entity crate. Routing ids are carried alongside so handlers do not
/// need to re-parse the payload to find recipients.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    /// Emitted when a new comment is created on a post. The delivery layer
    /// turns this into a durable notification plus a best-effort push to
    /// the post author.
    CommentCreated {
        /// Complete serialized comment entity.
        comment: Value,
        /// The user who wrote the comment.
        commenter_id: Id,
    },
    /// Emitted when a direct message is recorded. The delivery layer pushes
    /// it to the recipient's live connection if one exists.
    MessageSent {
        /// Complete serialized message entity.
        message: Value,
        sender_id: Id,
        recipient_id: Id,
    },
    /// Emitted when a vote is cast or changed on a post. No delivery
    /// listener currently subscribes; the event exists for parity with the
    /// other domain services and future score listeners.
    VoteCast { post_id: Id, voter_id: Id, value: i16 },
}

impl DomainEvent {
    pub fn topic(&self) -> Topic {
        match self {
            DomainEvent::CommentCreated { .. } => Topic::CommentCreated,
            DomainEvent::MessageSent { .. } => Topic::MessageSent,
            DomainEvent::VoteCast { .. } => Topic::VoteCast,
        }
    }
}

/// Error returned by an event handler. The bus logs these and moves on;
/// they never reach the publisher.
#[derive(Debug)]
pub struct HandlerError {
    pub message: String,
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event handler error: {}", self.message)
    }
}

impl StdError for HandlerError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

/// Trait for handling domain events.
/// Implementations perform side effects like pushing live updates or
/// recording notifications. A handler's failure is its own: it is logged
/// by the bus and does not affect sibling handlers or the publisher.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError>;
}

/// Dispatches domain events to the handlers subscribed to their topic.
///
/// Handlers for a topic are invoked sequentially, in subscription order, on
/// the publisher's call stack. Handlers must either be fast or hand work
/// off to their own tasks; a slow handler delays the publishing service.
pub struct EventBus {
    handlers: RwLock<HashMap<Topic, Vec<Arc<dyn EventHandler>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a handler for a topic. Multiple handlers per topic are
    /// allowed; subscription order is the dispatch order. Listeners are
    /// registered once at process start, so there is no unsubscribe.
    pub fn subscribe(&self, topic: Topic, handler: Arc<dyn EventHandler>) {
        let mut handlers = self
            .handlers
            .write()
            .expect("event bus handler table poisoned");
        handlers.entry(topic).or_default().push(handler);
    }

    /// Publish an event to every handler subscribed to its topic.
    ///
    /// A handler that returns an error is logged and does not prevent the
    /// remaining handlers from running. Nothing propagates to the caller,
    /// so a publishing domain service can never be failed by its listeners.
    pub async fn publish(&self, event: DomainEvent) {
        let topic = event.topic();

        // Clone the handler list out so the lock is not held across awaits.
        let subscribed: Vec<Arc<dyn EventHandler>> = {
            let handlers = self
                .handlers
                .read()
                .expect("event bus handler table poisoned");
            match handlers.get(&topic) {
                Some(list) => list.clone(),
                None => {
                    trace!("No handlers subscribed to topic {topic}");
                    return;
                }
            }
        };

        for handler in subscribed {
            if let Err(e) = handler.handle(&event).await {
                error!("Handler for topic {topic} failed: {e}");
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct RecordingHandler {
        label: &'static str,
        calls: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    #[async_trait]
    impl EventHandler for RecordingHandler {
        async fn handle(&self, _event: &DomainEvent) -> Result<(), HandlerError> {
            self.calls.lock().unwrap().push(self.label);
            if self.fail {
                Err(HandlerError::new("deliberate failure"))
            } else {
                Ok(())
            }
        }
    }

    fn comment_event() -> DomainEvent {
        DomainEvent::CommentCreated {
            comment: json!({"id": Uuid::new_v4(), "body": "nice post"}),
            commenter_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn publish_invokes_handlers_in_subscription_order() {
        let bus = EventBus::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            bus.subscribe(
                Topic::CommentCreated,
                Arc::new(RecordingHandler {
                    label,
                    calls: calls.clone(),
                    fail: false,
                }),
            );
        }

        bus.publish(comment_event()).await;

        assert_eq!(*calls.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn failing_handler_does_not_stop_later_handlers() {
        let bus = EventBus::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        bus.subscribe(
            Topic::CommentCreated,
            Arc::new(RecordingHandler {
                label: "faulty",
                calls: calls.clone(),
                fail: true,
            }),
        );
        bus.subscribe(
            Topic::CommentCreated,
            Arc::new(RecordingHandler {
                label: "survivor",
                calls: calls.clone(),
                fail: false,
            }),
        );

        bus.publish(comment_event()).await;

        assert_eq!(*calls.lock().unwrap(), vec!["faulty", "survivor"]);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_no_op() {
        let bus = EventBus::new();

        // VoteCast has no subscribers here; this must simply return.
        bus.publish(DomainEvent::VoteCast {
            post_id: Uuid::new_v4(),
            voter_id: Uuid::new_v4(),
            value: 1,
        })
        .await;
    }

    #[tokio::test]
    async fn handlers_only_receive_their_topic() {
        let bus = EventBus::new();
        let comment_calls = Arc::new(Mutex::new(Vec::new()));
        let message_calls = Arc::new(Mutex::new(Vec::new()));

        bus.subscribe(
            Topic::CommentCreated,
            Arc::new(RecordingHandler {
                label: "comments",
                calls: comment_calls.clone(),
                fail: false,
            }),
        );
        bus.subscribe(
            Topic::MessageSent,
            Arc::new(RecordingHandler {
                label: "messages",
                calls: message_calls.clone(),
                fail: false,
            }),
        );

        bus.publish(comment_event()).await;

        assert_eq!(comment_calls.lock().unwrap().len(), 1);
        assert!(message_calls.lock().unwrap().is_empty());
    }
}
