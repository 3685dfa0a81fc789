//! Rolling conversation history for the chat client.

use crate::types::{Message, Role};

/// An ordered log of role-tagged messages.
///
/// At most one message has [`Role::System`], and when present it sits at index 0.  The only
/// mutations are [`set_system_prompt`](Self::set_system_prompt),
/// [`append_user`](Self::append_user), [`append_assistant`](Self::append_assistant), and
/// [`clear`](Self::clear), so the invariant cannot be broken from outside.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the system message, or insert one at the head if there is none.
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        let message = Message::system(prompt);
        match self.messages.first_mut() {
            Some(head) if head.role == Role::System => *head = message,
            _ => self.messages.insert(0, message),
        }
    }

    /// The current system prompt, if any.
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .first()
            .filter(|head| head.role == Role::System)
            .map(|head| head.content.as_str())
    }

    /// Append a user turn.
    pub fn append_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    /// Append an assistant turn.
    pub fn append_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    /// The most recent user turn, if any.
    pub fn last_user(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == Role::User)
            .map(|message| message.content.as_str())
    }

    /// Remove every message, including the system prompt.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// The messages in conversation order, ready to go into a request.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Borrow the messages in conversation order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages, counting the system prompt.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if there are no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system_count(history: &ConversationHistory) -> usize {
        history
            .messages()
            .iter()
            .filter(|m| m.role == Role::System)
            .count()
    }

    #[test]
    fn new_history_empty() {
        let history = ConversationHistory::new();
        assert!(history.is_empty());
        assert!(history.system_prompt().is_none());
    }

    #[test]
    fn appends_preserve_call_order() {
        let mut history = ConversationHistory::new();
        history.append_user("one");
        history.append_assistant("two");
        history.append_user("three");
        history.append_user("three");
        let contents: Vec<_> = history
            .snapshot()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["one", "two", "three", "three"]);
    }

    #[test]
    fn system_prompt_inserted_at_head_after_turns() {
        let mut history = ConversationHistory::new();
        history.append_user("hi");
        history.append_assistant("hello");
        history.set_system_prompt("Be terse.");
        let snapshot = history.snapshot();
        assert_eq!(snapshot[0], Message::system("Be terse."));
        assert_eq!(snapshot[1], Message::user("hi"));
        assert_eq!(snapshot.len(), 3);
    }

    #[test]
    fn set_system_prompt_twice_replaces() {
        let mut history = ConversationHistory::new();
        history.set_system_prompt("first");
        history.append_user("hi");
        history.set_system_prompt("second");
        assert_eq!(history.len(), 2);
        assert_eq!(system_count(&history), 1);
        assert_eq!(history.system_prompt(), Some("second"));
    }

    #[test]
    fn clear_removes_everything() {
        let mut history = ConversationHistory::new();
        history.set_system_prompt("sys");
        history.append_user("hi");
        history.clear();
        assert!(history.is_empty());
        assert!(history.system_prompt().is_none());
    }

    #[test]
    fn last_user_skips_assistant_turns() {
        let mut history = ConversationHistory::new();
        assert!(history.last_user().is_none());
        history.append_user("question");
        history.append_assistant("answer");
        assert_eq!(history.last_user(), Some("question"));
    }

    #[test]
    fn interleaved_mutations_keep_invariant() {
        let mut history = ConversationHistory::new();
        for i in 0..20 {
            match i % 4 {
                0 => history.append_user(format!("u{i}")),
                1 => history.append_assistant(format!("a{i}")),
                2 => history.set_system_prompt(format!("s{i}")),
                _ => history.append_user(format!("u{i}")),
            }
            assert!(system_count(&history) <= 1);
            if history.system_prompt().is_some() {
                assert_eq!(history.messages()[0].role, Role::System);
            }
        }
        assert_eq!(history.system_prompt(), Some("s18"));
    }
}
