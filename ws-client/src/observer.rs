use anyhow::{bail, Result};
use serde_json::Value;
use std::sync::Arc;

/// Discriminant tags of the wire payloads this client understands.
pub const NEW_COMMENT_NOTIFICATION: &str = "NEW_COMMENT_NOTIFICATION";
pub const NEW_CHAT_MESSAGE: &str = "NEW_CHAT_MESSAGE";

/// Callback into application state. Observers never hold transport logic;
/// they validate a payload and hand its body to exactly one of these.
pub type StateCallback = Box<dyn Fn(&Value) + Send + Sync>;

/// A subscriber on the live channel. `update` receives every parsed
/// inbound frame; an observer ignores frames that are not its type,
/// invokes its callback exactly once for a valid payload, and returns an
/// error (for the transport to log) for a malformed payload of its own
/// type. It must never panic on bad input.
pub trait Observer: Send + Sync {
    fn name(&self) -> &'static str;

    fn update(&self, payload: &Value) -> Result<()>;
}

fn payload_type(payload: &Value) -> Option<&str> {
    payload.get("type").and_then(Value::as_str)
}

fn require_str_field(body: &Value, field: &str) -> Result<()> {
    if body.get(field).and_then(Value::as_str).is_none() {
        bail!("missing required field: {field}");
    }
    Ok(())
}

/// Translates `NEW_CHAT_MESSAGE` payloads into an application-state
/// callback ("append this chat message").
pub struct ChatObserver {
    on_message: StateCallback,
}

impl ChatObserver {
    pub fn new(on_message: impl Fn(&Value) + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            on_message: Box::new(on_message),
        })
    }
}

impl Observer for ChatObserver {
    fn name(&self) -> &'static str {
        "chat"
    }

    fn update(&self, payload: &Value) -> Result<()> {
        if payload_type(payload) != Some(NEW_CHAT_MESSAGE) {
            return Ok(());
        }

        let message = match payload.get("message") {
            Some(message) => message,
            None => bail!("chat payload has no message body"),
        };
        require_str_field(message, "id")?;
        require_str_field(message, "sender_id")?;
        require_str_field(message, "body")?;

        (self.on_message)(message);
        Ok(())
    }
}

/// Translates `NEW_COMMENT_NOTIFICATION` payloads into an application-state
/// callback ("append this notification and bump the unread counter").
pub struct NotificationObserver {
    on_notification: StateCallback,
}

impl NotificationObserver {
    pub fn new(on_notification: impl Fn(&Value) + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            on_notification: Box::new(on_notification),
        })
    }
}

impl Observer for NotificationObserver {
    fn name(&self) -> &'static str {
        "notification"
    }

    fn update(&self, payload: &Value) -> Result<()> {
        if payload_type(payload) != Some(NEW_COMMENT_NOTIFICATION) {
            return Ok(());
        }

        let notification = match payload.get("notification") {
            Some(notification) => notification,
            None => bail!("notification payload has no notification body"),
        };
        require_str_field(notification, "id")?;
        require_str_field(notification, "recipient_id")?;

        (self.on_notification)(notification);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn recording_chat_observer() -> (Arc<ChatObserver>, Arc<Mutex<Vec<Value>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let observer = ChatObserver::new(move |message| {
            sink.lock().unwrap().push(message.clone());
        });
        (observer, received)
    }

    #[test]
    fn valid_chat_message_invokes_callback_once() {
        let (observer, received) = recording_chat_observer();

        let payload = json!({
            "type": NEW_CHAT_MESSAGE,
            "message": {
                "id": "7b9d4b40-62f1-4c5a-9a9e-0a8c2b1d2e3f",
                "sender_id": "11d4b40a-62f1-4c5a-9a9e-0a8c2b1d2e3f",
                "body": "hello"
            }
        });
        observer.update(&payload).unwrap();

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["body"], "hello");
    }

    #[test]
    fn chat_message_missing_fields_is_dropped_without_callback() {
        let (observer, received) = recording_chat_observer();

        let payload = json!({"type": NEW_CHAT_MESSAGE, "message": {}});
        assert!(observer.update(&payload).is_err());
        assert!(received.lock().unwrap().is_empty());
    }

    #[test]
    fn other_payload_types_are_ignored() {
        let (observer, received) = recording_chat_observer();

        let payload = json!({"type": NEW_COMMENT_NOTIFICATION, "notification": {}});
        observer.update(&payload).unwrap();

        assert!(received.lock().unwrap().is_empty());
    }

    #[test]
    fn notification_observer_validates_required_fields() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let observer = NotificationObserver::new(move |notification| {
            sink.lock().unwrap().push(notification.clone());
        });

        let valid = json!({
            "type": NEW_COMMENT_NOTIFICATION,
            "notification": {
                "id": "7b9d4b40-62f1-4c5a-9a9e-0a8c2b1d2e3f",
                "recipient_id": "11d4b40a-62f1-4c5a-9a9e-0a8c2b1d2e3f",
                "content": "ada commented on your post"
            }
        });
        observer.update(&valid).unwrap();
        assert_eq!(received.lock().unwrap().len(), 1);

        let missing_recipient = json!({
            "type": NEW_COMMENT_NOTIFICATION,
            "notification": {"id": "7b9d4b40-62f1-4c5a-9a9e-0a8c2b1d2e3f"}
        });
        assert!(observer.update(&missing_recipient).is_err());
        assert_eq!(received.lock().unwrap().len(), 1);
    }
}
