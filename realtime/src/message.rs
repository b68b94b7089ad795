use serde::Serialize;
use serde_json::Value;

/// Keepalive probes are literal text frames, not JSON. The client sends
/// `ping` on an interval; the server answers `pong`.
pub const KEEPALIVE_PING: &str = "ping";
pub const KEEPALIVE_PONG: &str = "pong";

/// The discriminated union sent over the live channel, one JSON object per
/// frame. The `type` tag is what the browser dispatches on.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Payload {
    #[serde(rename = "NEW_COMMENT_NOTIFICATION")]
    NewCommentNotification { notification: Value },

    #[serde(rename = "NEW_CHAT_MESSAGE")]
    NewChatMessage { message: Value },
}

impl Payload {
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::NewCommentNotification { .. } => "NEW_COMMENT_NOTIFICATION",
            Payload::NewChatMessage { .. } => "NEW_CHAT_MESSAGE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_serializes_with_type_tag() {
        let payload = Payload::NewChatMessage {
            message: json!({"body": "hello"}),
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["type"], "NEW_CHAT_MESSAGE");
        assert_eq!(value["message"]["body"], "hello");
    }
}
