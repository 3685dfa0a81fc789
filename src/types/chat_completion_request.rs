use serde::{Deserialize, Serialize};

use crate::types::Message;

/// Body of a chat-completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// The model that should answer.
    pub model: String,

    /// The conversation so far, oldest first.
    pub messages: Vec<Message>,

    /// Sampling temperature.
    pub temperature: Option<f32>,

    /// Whether the response should arrive as an event stream.
    pub stream: Option<bool>,
}

impl ChatCompletionRequest {
    /// Create a new non-streaming request.
    pub fn new(model: impl Into<String>, messages: Vec<Message>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: Some(temperature),
            stream: Some(false),
        }
    }

    /// Turn this request into a streaming request.
    pub fn streaming(mut self) -> Self {
        self.stream = Some(true);
        self
    }

    /// Returns true if the request asks for an event stream.
    pub fn is_streaming(&self) -> bool {
        self.stream.unwrap_or(false)
    }
}
