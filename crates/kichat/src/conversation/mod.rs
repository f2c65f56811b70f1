//! Conversation model
//!
//! A conversation is an ordered list of messages. Insertion order is
//! chronological and is the prompt context sent upstream.

pub mod message;

pub use message::{Message, Role};

use serde::{Deserialize, Serialize};

/// Ordered sequence of messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Drop the most recent message, returning it
    pub fn pop(&mut self) -> Option<Message> {
        self.messages.pop()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl From<Vec<Message>> for Conversation {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_keeps_insertion_order() {
        let mut conversation = Conversation::new();
        conversation.push(Message::user("first"));
        conversation.push(Message::assistant("second"));
        conversation.push(Message::user("third"));

        let contents: Vec<&str> = conversation
            .messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_conversation_pop_drops_last() {
        let mut conversation: Conversation =
            vec![Message::user("hi"), Message::assistant("hello")].into();
        let popped = conversation.pop().unwrap();
        assert_eq!(popped.role, Role::Assistant);
        assert_eq!(conversation.len(), 1);
    }

    #[test]
    fn test_conversation_serializes_as_array() {
        let conversation: Conversation = vec![Message::user("hi")].into();
        let json = serde_json::to_value(&conversation).unwrap();
        assert_eq!(json, serde_json::json!([{"role": "user", "content": "hi"}]));
    }
}
