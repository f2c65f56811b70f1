//! Kichat - streaming chat client
//!
//! Sends a conversation to an OpenRouter-compatible completion endpoint,
//! streams the reply back as text fragments, and keeps the local
//! conversation consistent with a chat store.

pub mod auth;
pub mod chat;
pub mod config;
pub mod conversation;
pub mod error;
pub mod logging;
pub mod network;
pub mod providers;
pub mod store;
pub mod streaming;

pub use chat::{ChatController, TurnCallbacks, TurnOutcome, TurnPhase};
pub use config::ChatConfig;
pub use conversation::{Conversation, Message, Role};
pub use error::{ChatError, ChatResult};
pub use providers::{CompletionClient, CompletionProvider};
pub use store::{ChatStore, MemoryChatStore, SqliteChatStore};
