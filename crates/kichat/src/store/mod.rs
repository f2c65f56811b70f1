//! Chat persistence
//!
//! Chats belong to one owner and hold an ordered list of messages. Chats list
//! newest first; messages list oldest first. Deleting a chat deletes its
//! messages.

mod memory;
mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conversation::{Message, Role};
use crate::error::ChatResult;

pub use memory::MemoryChatStore;
pub use sqlite::SqliteChatStore;

/// A persisted chat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub id: String,
    pub owner: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// A persisted message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub chat_id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl MessageRecord {
    pub fn to_message(&self) -> Message {
        Message::new(self.role, self.content.clone())
    }
}

/// Storage for chats and their messages
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Chats of `owner`, newest first
    async fn list_chats(&self, owner: &str, limit: usize) -> ChatResult<Vec<ChatRecord>>;

    async fn create_chat(&self, owner: &str, title: &str) -> ChatResult<ChatRecord>;

    /// Delete a chat and all of its messages
    async fn delete_chat(&self, id: &str) -> ChatResult<()>;

    /// Messages of a chat, oldest first
    async fn list_messages(&self, chat_id: &str, limit: usize) -> ChatResult<Vec<MessageRecord>>;

    async fn create_message(
        &self,
        chat_id: &str,
        role: Role,
        content: &str,
    ) -> ChatResult<MessageRecord>;

    async fn delete_message(&self, id: &str) -> ChatResult<()>;
}
