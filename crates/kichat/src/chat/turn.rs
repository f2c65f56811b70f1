//! Per-turn state
//!
//! A turn moves `Idle -> UserMessageAppended -> Streaming` and resolves as
//! `Committed` or `RolledBack`. Every side effect taken before the reply is
//! committed is recorded in a [`TurnLog`] so a failure can undo it in reverse.

use std::fmt;

use crate::error::ChatError;

/// Where a turn currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnPhase {
    #[default]
    Idle,
    UserMessageAppended,
    Streaming,
    Committed,
    RolledBack,
}

impl TurnPhase {
    /// A turn has started and not yet resolved
    pub fn is_in_flight(&self) -> bool {
        matches!(self, TurnPhase::UserMessageAppended | TurnPhase::Streaming)
    }
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnPhase::Idle => "idle",
            TurnPhase::UserMessageAppended => "user_message_appended",
            TurnPhase::Streaming => "streaming",
            TurnPhase::Committed => "committed",
            TurnPhase::RolledBack => "rolled_back",
        };
        f.write_str(name)
    }
}

/// A reversible side effect of a turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnStep {
    /// User message appended to local state (guest history when `guest`)
    LocalAppend { guest: bool },
    /// User message persisted under this record id
    RemoteMessage { id: String },
    /// Chat created for this turn; kept on rollback
    ChatCreated { id: String },
}

impl TurnStep {
    pub fn is_undoable(&self) -> bool {
        !matches!(self, TurnStep::ChatCreated { .. })
    }
}

/// Ordered record of a turn's side effects
#[derive(Debug, Clone, Default)]
pub struct TurnLog {
    steps: Vec<TurnStep>,
}

impl TurnLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, step: TurnStep) {
        self.steps.push(step);
    }

    /// Ids of persisted user message records
    pub fn remote_message_ids(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().filter_map(|step| match step {
            TurnStep::RemoteMessage { id } => Some(id.as_str()),
            _ => None,
        })
    }

    /// Steps to undo, most recent first
    pub fn into_undo(self) -> impl Iterator<Item = TurnStep> {
        self.steps.into_iter().rev().filter(TurnStep::is_undoable)
    }
}

/// Assistant reply being assembled from streamed fragments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingReply {
    content: String,
}

impl PendingReply {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: &str) {
        self.content.push_str(fragment);
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn clear(&mut self) {
        self.content.clear();
    }

    /// Take the assembled reply, leaving the buffer empty
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.content)
    }
}

/// Observer hooks for a turn
#[derive(Default)]
pub struct TurnCallbacks {
    pub on_phase: Option<Box<dyn Fn(TurnPhase) + Send + Sync>>,
    /// Receives the new fragment and the reply assembled so far
    pub on_fragment: Option<Box<dyn Fn(&str, &str) + Send + Sync>>,
    pub on_error: Option<Box<dyn Fn(&ChatError) + Send + Sync>>,
}

impl TurnCallbacks {
    pub(crate) fn phase(&self, phase: TurnPhase) {
        if let Some(ref cb) = self.on_phase {
            cb(phase);
        }
    }

    pub(crate) fn fragment(&self, fragment: &str, buffer: &str) {
        if let Some(ref cb) = self.on_fragment {
            cb(fragment, buffer);
        }
    }

    pub(crate) fn error(&self, error: &ChatError) {
        if let Some(ref cb) = self.on_error {
            cb(error);
        }
    }
}

/// How a successful turn resolved
#[derive(Debug)]
pub enum TurnOutcome {
    /// Reply committed locally and, when signed in, persisted
    Committed { reply: String },
    /// Reply committed locally but could not be persisted
    CommittedUnsaved { reply: String, error: ChatError },
}

impl TurnOutcome {
    pub fn reply(&self) -> &str {
        match self {
            TurnOutcome::Committed { reply } | TurnOutcome::CommittedUnsaved { reply, .. } => reply,
        }
    }

    pub fn is_saved(&self) -> bool {
        matches!(self, TurnOutcome::Committed { .. })
    }
}

/// Title for a chat started by `first_message`
pub fn chat_title(first_message: &str, max_chars: usize) -> String {
    let mut chars = first_message.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
