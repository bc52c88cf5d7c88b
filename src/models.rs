use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque reference to a locally stored photo, usually a `file://` URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageReference(String);

impl ImageReference {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who produced a turn, and what extra data that kind of turn carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageKind {
    User {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image: Option<ImageReference>,
    },
    Bot {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        structured_data: Option<Map<String, Value>>,
    },
    Error,
    Typing,
}

/// One chat turn. Fields are fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: String,
    text: String,
    #[serde(flatten)]
    kind: MessageKind,
    timestamp: DateTime<Utc>,
}

impl Message {
    pub(crate) fn new(id: String, text: String, kind: MessageKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            text,
            kind,
            timestamp,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> &MessageKind {
        &self.kind
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn image(&self) -> Option<&ImageReference> {
        match &self.kind {
            MessageKind::User { image } => image.as_ref(),
            _ => None,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self.kind, MessageKind::User { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, MessageKind::Error)
    }

    pub fn is_typing(&self) -> bool {
        matches!(self.kind, MessageKind::Typing)
    }
}

/// Assistant reply split into readable text and an optional embedded JSON object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedReply {
    pub text: String,
    pub structured_data: Option<Map<String, Value>>,
}

impl ParsedReply {
    pub fn has_structured_data(&self) -> bool {
        self.structured_data.is_some()
    }
}

/// One call to the chat backend.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub message: String,
    pub image: Option<ImageReference>,
}

// Backend /api/chat response format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Saved conversation as kept by the session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_message_serializes_with_kind_tag() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let msg = Message::new(
            "abc".to_string(),
            "look at this leaf".to_string(),
            MessageKind::User {
                image: Some(ImageReference::new("file:///tmp/leaf.jpg")),
            },
            ts,
        );

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["kind"], "user");
        assert_eq!(value["image"], "file:///tmp/leaf.jpg");
        assert_eq!(value["id"], "abc");

        let back: Message = serde_json::from_value(value).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_chat_reply_tolerates_extra_fields() {
        let reply: ChatReply =
            serde_json::from_str(r#"{"response":"hi","session_id":null,"extra":1}"#).unwrap();
        assert_eq!(reply.response, "hi");
        assert!(reply.session_id.is_none());
    }
}
