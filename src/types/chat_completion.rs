use serde::{Deserialize, Serialize};

use crate::types::Role;

/// A non-streaming chat-completion response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletion {
    /// Provider-assigned completion identifier.
    #[serde(default)]
    pub id: Option<String>,

    /// Candidate replies; only the first is used.
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// One candidate reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    /// The reply, if the provider produced one.
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
}

/// The message carried by a [`Choice`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceMessage {
    /// Author of the message.  Kept as the raw string so unexpected roles still parse.
    #[serde(default)]
    pub role: Option<String>,

    /// Text of the message; may be null for non-text replies.
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletion {
    /// The text of the first assistant message, if any.
    pub fn assistant_text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.as_ref())
            .filter(|message| message.role.as_deref() == Some(Role::Assistant.as_str()))
            .and_then(|message| message.content.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_assistant_text() {
        let completion: ChatCompletion = serde_json::from_str(
            r#"{"id":"c-1","choices":[{"message":{"role":"assistant","content":"Hello!"}}]}"#,
        )
        .unwrap();
        assert_eq!(completion.id.as_deref(), Some("c-1"));
        assert_eq!(completion.assistant_text(), Some("Hello!"));
    }

    #[test]
    fn missing_choices_has_no_text() {
        let completion: ChatCompletion = serde_json::from_str(r#"{"id":"c-2"}"#).unwrap();
        assert_eq!(completion.assistant_text(), None);
    }

    #[test]
    fn other_roles_have_no_text() {
        let completion: ChatCompletion = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"tool","content":"42"}}]}"#,
        )
        .unwrap();
        assert_eq!(completion.choices[0].message.as_ref().unwrap().role.as_deref(), Some("tool"));
        assert_eq!(completion.assistant_text(), None);

        let completion: ChatCompletion =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"hi"}}]}"#).unwrap();
        assert_eq!(completion.assistant_text(), None);
    }

    #[test]
    fn null_content_has_no_text() {
        let completion: ChatCompletion = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#,
        )
        .unwrap();
        assert_eq!(completion.assistant_text(), None);
    }
}
