use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{ChatRecord, ChatStore, MessageRecord};
use crate::conversation::Role;
use crate::error::{ChatError, ChatResult};

#[derive(Debug, Default)]
struct StoreState {
    // insertion order breaks timestamp ties
    chats: Vec<ChatRecord>,
    messages: Vec<MessageRecord>,
}

/// In-process chat store
#[derive(Debug, Default)]
pub struct MemoryChatStore {
    state: RwLock<StoreState>,
}

impl MemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chat_count(&self) -> usize {
        self.state.read().chats.len()
    }

    pub fn message_count(&self) -> usize {
        self.state.read().messages.len()
    }
}

#[async_trait]
impl ChatStore for MemoryChatStore {
    async fn list_chats(&self, owner: &str, limit: usize) -> ChatResult<Vec<ChatRecord>> {
        let state = self.state.read();
        let mut chats: Vec<ChatRecord> = state
            .chats
            .iter()
            .filter(|chat| chat.owner == owner)
            .cloned()
            .collect();
        chats.sort_by_key(|chat| chat.created_at);
        chats.reverse();
        chats.truncate(limit);
        Ok(chats)
    }

    async fn create_chat(&self, owner: &str, title: &str) -> ChatResult<ChatRecord> {
        let chat = ChatRecord {
            id: Uuid::new_v4().to_string(),
            owner: owner.to_string(),
            title: title.to_string(),
            created_at: Utc::now(),
        };
        self.state.write().chats.push(chat.clone());
        Ok(chat)
    }

    async fn delete_chat(&self, id: &str) -> ChatResult<()> {
        let mut state = self.state.write();
        let before = state.chats.len();
        state.chats.retain(|chat| chat.id != id);
        if state.chats.len() == before {
            return Err(ChatError::NotFound(format!("chat {}", id)));
        }
        state.messages.retain(|message| message.chat_id != id);
        Ok(())
    }

    async fn list_messages(&self, chat_id: &str, limit: usize) -> ChatResult<Vec<MessageRecord>> {
        let state = self.state.read();
        let mut messages: Vec<MessageRecord> = state
            .messages
            .iter()
            .filter(|message| message.chat_id == chat_id)
            .cloned()
            .collect();
        messages.sort_by_key(|message| message.timestamp);
        messages.truncate(limit);
        Ok(messages)
    }

    async fn create_message(
        &self,
        chat_id: &str,
        role: Role,
        content: &str,
    ) -> ChatResult<MessageRecord> {
        let mut state = self.state.write();
        if !state.chats.iter().any(|chat| chat.id == chat_id) {
            return Err(ChatError::NotFound(format!("chat {}", chat_id)));
        }
        let message = MessageRecord {
            id: Uuid::new_v4().to_string(),
            chat_id: chat_id.to_string(),
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
        };
        state.messages.push(message.clone());
        Ok(message)
    }

    async fn delete_message(&self, id: &str) -> ChatResult<()> {
        let mut state = self.state.write();
        let before = state.messages.len();
        state.messages.retain(|message| message.id != id);
        if state.messages.len() == before {
            return Err(ChatError::NotFound(format!("message {}", id)));
        }
        Ok(())
    }
}
