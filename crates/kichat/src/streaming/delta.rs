//! Delta extraction from completion chunks
//!
//! Each data payload is a JSON chunk shaped like
//! `{"choices":[{"delta":{"content":"..."}}]}`. Only the first choice's
//! content is used. Payloads that fail to decode, or that carry no content,
//! produce nothing.

use serde::Deserialize;
use tracing::debug;

/// Full-width spelling of the beginning-of-sentence marker
pub const BOS_TOKEN_FULLWIDTH: &str = "<｜begin▁of▁sentence｜>";

/// ASCII spelling of the beginning-of-sentence marker
pub const BOS_TOKEN_ASCII: &str = "<|begin_of_sentence|>";

/// Control tokens some upstream models leak into their output
pub const CONTROL_TOKENS: &[&str] = &[BOS_TOKEN_FULLWIDTH, BOS_TOKEN_ASCII];

#[derive(Debug, Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Extract the cleaned text fragment from one data payload
pub fn extract_delta(payload: &str) -> Option<String> {
    let chunk: ChunkPayload = match serde_json::from_str(payload) {
        Ok(chunk) => chunk,
        Err(e) => {
            debug!("Skipping malformed stream frame: {}", e);
            return None;
        }
    };

    let content = chunk
        .choices
        .into_iter()
        .next()?
        .delta?
        .content
        .filter(|content| !content.is_empty())?;

    let cleaned = strip_control_tokens(&content);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Remove every occurrence of both control-token spellings
///
/// Removal repeats until neither spelling remains, so a token that only
/// appears after an inner one is removed is stripped too.
pub fn strip_control_tokens(text: &str) -> String {
    let mut cleaned = text.to_string();
    while let Some(token) = CONTROL_TOKENS.iter().find(|t| cleaned.contains(*t)) {
        cleaned = cleaned.replace(token, "");
    }
    cleaned
}

/// Cleanup applied to a complete, non-streamed reply
pub fn clean_reply(text: &str) -> String {
    strip_control_tokens(text).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(content: &str) -> String {
        serde_json::json!({ "choices": [{ "delta": { "content": content } }] }).to_string()
    }

    #[test]
    fn test_extracts_content() {
        assert_eq!(extract_delta(&chunk("Hel")).as_deref(), Some("Hel"));
    }

    #[test]
    fn test_keeps_whitespace_only_fragments() {
        assert_eq!(extract_delta(&chunk(" \n")).as_deref(), Some(" \n"));
    }

    #[test]
    fn test_malformed_payload_yields_nothing() {
        assert!(extract_delta("{not json").is_none());
        assert!(extract_delta("").is_none());
    }

    #[test]
    fn test_missing_fields_yield_nothing() {
        assert!(extract_delta(r#"{"choices":[]}"#).is_none());
        assert!(extract_delta(r#"{"id":"gen-1"}"#).is_none());
        assert!(extract_delta(r#"{"choices":[{"delta":{}}]}"#).is_none());
        assert!(extract_delta(r#"{"choices":[{"delta":{"content":null}}]}"#).is_none());
        assert!(
            extract_delta(r#"{"choices":[{"delta":{"role":"assistant","content":""}}]}"#).is_none()
        );
        assert!(extract_delta(r#"{"choices":[{"finish_reason":"stop"}]}"#).is_none());
    }

    #[test]
    fn test_non_string_content_is_skipped() {
        assert!(extract_delta(r#"{"choices":[{"delta":{"content":42}}]}"#).is_none());
    }

    #[test]
    fn test_uses_first_choice_only() {
        let payload = r#"{"choices":[{"delta":{"content":"a"}},{"delta":{"content":"b"}}]}"#;
        assert_eq!(extract_delta(payload).as_deref(), Some("a"));
    }

    #[test]
    fn test_strips_both_token_spellings() {
        let text = format!(
            "{}Hi{} there{}{}",
            BOS_TOKEN_FULLWIDTH, BOS_TOKEN_ASCII, BOS_TOKEN_ASCII, BOS_TOKEN_FULLWIDTH
        );
        assert_eq!(strip_control_tokens(&text), "Hi there");
    }

    #[test]
    fn test_strips_nested_tokens() {
        let text = "<|begin_of<|begin_of_sentence|>_sentence|>ok";
        assert_eq!(strip_control_tokens(text), "ok");
    }

    #[test]
    fn test_token_only_fragment_yields_nothing() {
        assert!(extract_delta(&chunk(BOS_TOKEN_FULLWIDTH)).is_none());
        assert!(extract_delta(&chunk(&BOS_TOKEN_ASCII.repeat(3))).is_none());
    }

    #[test]
    fn test_clean_reply_trims() {
        let text = format!("{}  Bonjour !\n", BOS_TOKEN_ASCII);
        assert_eq!(clean_reply(&text), "Bonjour !");
    }
}
