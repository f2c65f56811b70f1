//! Chat turns
//!
//! [`ChatController`] keeps the visible conversation consistent with the
//! chat store while a reply streams in.

mod controller;
pub mod turn;

pub use controller::{ChatController, LocalMessage};
pub use turn::{
    chat_title, PendingReply, TurnCallbacks, TurnLog, TurnOutcome, TurnPhase, TurnStep,
};
