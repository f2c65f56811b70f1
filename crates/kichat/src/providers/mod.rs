//! Completion providers
//!
//! A provider turns a conversation into an assistant reply, either as a lazy
//! fragment stream or as one complete string. The two forms agree: joining
//! the fragments of a stream yields the same text the complete form returns,
//! up to surrounding whitespace.

pub mod openrouter;
pub mod types;

use async_trait::async_trait;

use crate::conversation::Message;
use crate::error::ChatResult;
use crate::streaming::FragmentStream;

pub use openrouter::CompletionClient;
pub use types::{CompletionRequest, CompletionResponse};

/// Source of assistant replies
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Request a streamed reply
    ///
    /// Fails before yielding anything when the endpoint answers with a
    /// non-success status.
    async fn stream_completion(&self, messages: &[Message]) -> ChatResult<FragmentStream>;

    /// Request a complete reply, with control tokens removed and whitespace trimmed
    async fn send_completion(&self, messages: &[Message]) -> ChatResult<String>;

    /// Model identifier sent with each request
    fn model(&self) -> &str;
}
