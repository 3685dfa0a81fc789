use serde::{Deserialize, Serialize};

use crate::types::ApiErrorObject;

/// One `data:` record of a streaming chat completion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    /// Incremental updates; only the first is used.
    #[serde(default)]
    pub choices: Option<Vec<ChunkChoice>>,

    /// A provider error reported inside the stream.
    #[serde(default)]
    pub error: Option<ApiErrorObject>,
}

/// One incremental update inside a [`ChatCompletionChunk`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    /// The new content, if any.
    #[serde(default)]
    pub delta: Option<Delta>,
}

/// The text added by one chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    /// Newly produced text.
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionChunk {
    /// The delta text of the first choice, if present.
    pub fn content(&self) -> Option<&str> {
        self.choices
            .as_ref()
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.delta.as_ref())
            .and_then(|delta| delta.content.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_of_first_choice() {
        let chunk: ChatCompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":"Hi"}}]}"#).unwrap();
        assert_eq!(chunk.content(), Some("Hi"));
        assert!(chunk.error.is_none());
    }

    #[test]
    fn role_only_delta_has_no_content() {
        let chunk: ChatCompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap();
        assert_eq!(chunk.content(), None);
    }

    #[test]
    fn error_record() {
        let chunk: ChatCompletionChunk =
            serde_json::from_str(r#"{"error":{"message":"overloaded","type":"server_error"}}"#)
                .unwrap();
        assert_eq!(chunk.content(), None);
        assert_eq!(chunk.error.unwrap().message, "overloaded");
    }
}
