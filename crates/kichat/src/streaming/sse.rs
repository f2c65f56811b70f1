//! Server-Sent Events (SSE) frame parsing
//!
//! Completion streams are newline-delimited. Only lines starting with
//! `data: ` carry a payload; `data: [DONE]` ends the stream. Everything else
//! is noise and is dropped.
//!
//! Bytes arrive in arbitrary chunks, so the incomplete tail of each read is
//! carried over to the next one. Line splitting happens on raw bytes, which
//! keeps multi-byte UTF-8 sequences intact across read boundaries.

/// Prefix of a data-bearing line
pub const DATA_PREFIX: &str = "data: ";

/// Payload that terminates the stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// A single decoded line of the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// Payload of a `data: ` line, forwarded to the delta extractor
    Data(String),
    /// `data: [DONE]`
    Done,
    /// Any other line
    Ignored,
}

impl StreamFrame {
    /// Classify one complete line (without its line terminator)
    pub fn from_line(line: &str) -> Self {
        match line.strip_prefix(DATA_PREFIX) {
            Some(DONE_SENTINEL) => StreamFrame::Done,
            Some(payload) => StreamFrame::Data(payload.to_string()),
            None => StreamFrame::Ignored,
        }
    }
}

/// Newline decoder for byte-level buffering
/// Handles both CRLF and LF line endings
#[derive(Debug, Default)]
pub struct NewlineDecoder {
    buffer: Vec<u8>,
}

impl NewlineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a chunk of bytes, extracting complete lines
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(end) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=end).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }

        lines
    }

    /// Bytes received after the last newline
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Take the unterminated tail, leaving the decoder empty
    pub fn flush(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let tail = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        Some(tail)
    }
}

/// Incremental frame parser
///
/// Feeds raw bytes through a [`NewlineDecoder`] and returns the data payloads
/// of complete lines. Once `[DONE]` is seen the parser is finished and all
/// further input, including the rest of the same read, is discarded.
#[derive(Debug, Default)]
pub struct FrameParser {
    newline_decoder: NewlineDecoder,
    finished: bool,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process incoming bytes, returning data payloads in wire order
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        if self.finished {
            return Vec::new();
        }

        let mut payloads = Vec::new();
        for line in self.newline_decoder.decode(bytes) {
            match StreamFrame::from_line(&line) {
                StreamFrame::Data(payload) => payloads.push(payload),
                StreamFrame::Done => {
                    self.finished = true;
                    self.newline_decoder.flush();
                    break;
                }
                StreamFrame::Ignored => {}
            }
        }
        payloads
    }

    /// Whether the terminal sentinel has been observed
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// End of input: returns the unterminated tail, which is never parsed
    pub fn finish(&mut self) -> Option<String> {
        self.finished = true;
        self.newline_decoder.flush()
    }
}
