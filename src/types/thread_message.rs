use serde::{Deserialize, Serialize};

use crate::types::Role;

/// Body of a request that appends a message to a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateMessageRequest {
    /// Always [`Role::User`] when sent by this client.
    pub role: Role,

    /// Text of the message.
    pub content: String,
}

impl CreateMessageRequest {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A page of thread messages, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageList {
    /// The messages on this page.
    #[serde(default)]
    pub data: Vec<ThreadMessage>,
}

/// A message stored in a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMessage {
    /// Author of the message.
    pub role: Role,

    /// Content blocks in order.
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

/// One content block of a [`ThreadMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent {
    /// Block kind, e.g. `text` or `image_file`.
    #[serde(rename = "type")]
    pub content_type: String,

    /// Present on text blocks.
    #[serde(default)]
    pub text: Option<TextContent>,
}

/// The text payload of a text block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContent {
    /// The text itself.
    pub value: String,
}

impl ThreadMessage {
    /// Concatenate the text blocks of this message if it was written by the assistant.
    ///
    /// Non-text blocks are skipped.  Messages from any other role yield an empty string.
    pub fn assistant_text(&self) -> String {
        if self.role != Role::Assistant {
            return String::new();
        }
        self.content
            .iter()
            .filter(|block| block.content_type == "text")
            .filter_map(|block| block.text.as_ref())
            .map(|text| text.value.as_str())
            .collect()
    }
}

impl MessageList {
    /// The assistant text of the newest message, empty if there is none.
    pub fn latest_assistant_text(&self) -> String {
        self.data
            .first()
            .map(ThreadMessage::assistant_text)
            .unwrap_or_default()
    }
}
