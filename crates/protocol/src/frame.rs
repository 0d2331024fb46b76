use serde::{Deserialize, Serialize};

/// Server → client frame.
///
/// A stream of non-terminal frames (`done: false`, non-empty `content`) is
/// closed by exactly one terminal frame (`done: true`, empty `content`,
/// `error` present when the exchange failed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFragment {
    pub content: String,
    pub done: bool,
    pub metadata: FragmentMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Frame metadata. Empty (`{}`) on frames sent before a session exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

impl FragmentMetadata {
    pub fn for_message(message_id: impl Into<String>) -> Self {
        Self {
            message_id: Some(message_id.into()),
        }
    }
}

impl StreamFragment {
    pub fn partial(message_id: &str, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            done: false,
            metadata: FragmentMetadata::for_message(message_id),
            error: None,
        }
    }

    pub fn terminal(message_id: &str) -> Self {
        Self {
            content: String::new(),
            done: true,
            metadata: FragmentMetadata::for_message(message_id),
            error: None,
        }
    }

    pub fn failed(message_id: &str, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::terminal(message_id)
        }
    }

    /// Terminal error frame that belongs to no exchange, e.g. a rejected
    /// connection or an unreadable client frame.
    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            done: true,
            metadata: FragmentMetadata::default(),
            error: Some(error.into()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.done
    }

    pub fn to_json(&self) -> String {
        // A struct of strings and bools always serializes.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Client → server chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMessage {
    pub content: String,
    #[serde(default, alias = "attachments")]
    pub attachment_ids: Vec<String>,
}

impl ClientMessage {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Response body of the request-response chat endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub message_id: String,
    pub content: String,
    pub done: bool,
}
