//! Chat Error Types
//!
//! All fallible chat operations return `Result<T, ChatError>`.
//! Per-frame decode failures inside a stream never reach this type; they are
//! skipped where they happen.

use thiserror::Error;

/// Generic notice shown to the user for any failed operation.
pub const GENERIC_FAILURE_NOTICE: &str = "Failed to send message";

/// Chat error types
#[derive(Debug, Error)]
pub enum ChatError {
    /// Non-success HTTP status or a failed read on the completion endpoint
    #[error("Transport error{}: {message}", format_status(.status))]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// Connection-level failure reported by the HTTP client
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed non-streaming completion body
    #[error("Decode error: {0}")]
    Decode(String),

    /// Chat store operation failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// SQLite store failure
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Authentication backend rejected the request
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Operation requires a signed-in user
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Blank user input
    #[error("Message is empty")]
    EmptyMessage,

    /// A previous turn has not resolved yet
    #[error("A message is already being sent")]
    TurnInFlight,

    /// Record lookup failed
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

fn format_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {})", s)).unwrap_or_default()
}

/// Result alias used across the crate
pub type ChatResult<T> = Result<T, ChatError>;

impl ChatError {
    /// Create a Transport error from a status code
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Create a Transport error without a status code
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: message.into(),
        }
    }

    /// Create a Persistence error
    pub fn persistence(reason: impl Into<String>) -> Self {
        Self::Persistence(reason.into())
    }

    /// Create an Auth error
    pub fn auth(reason: impl Into<String>) -> Self {
        Self::Auth(reason.into())
    }

    /// Create a Config error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config(reason.into())
    }

    /// Check if this error came from the completion transport
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Http(_))
    }

    /// Check if this error came from the chat store
    pub fn is_persistence_error(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Sqlx(_))
    }

    /// The single notification surfaced at the interface boundary
    pub fn user_notice(&self) -> &'static str {
        GENERIC_FAILURE_NOTICE
    }
}
