//! Streaming Module
//!
//! Provides streaming support for completion responses:
//! - SSE frame parsing with carryover across partial reads
//! - Delta extraction and control-token cleanup
//! - Lazy fragment streams over a response body
//!

pub mod delta;
pub mod fragments;
pub mod sse;

// Re-exports
pub use delta::{clean_reply, extract_delta, strip_control_tokens, CONTROL_TOKENS};
pub use fragments::{collect_fragments, fragment_stream, FragmentStream};
pub use sse::{FrameParser, NewlineDecoder, StreamFrame, DATA_PREFIX, DONE_SENTINEL};
