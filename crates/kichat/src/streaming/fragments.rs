//! Fragment stream
//!
//! Turns a streamed response body into a lazy, single-pass sequence of
//! cleaned text fragments. The body is owned by the stream and dropped on
//! every exit path: `[DONE]`, end of body, read error, idle timeout, or the
//! caller dropping the stream early.

use async_stream::try_stream;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::pin::Pin;
use tracing::{debug, trace};

use super::delta::extract_delta;
use super::sse::FrameParser;
use crate::error::{ChatError, ChatResult};
use crate::network::with_timeout;

/// Lazy sequence of cleaned text fragments in arrival order
pub type FragmentStream = Pin<Box<dyn Stream<Item = ChatResult<String>> + Send>>;

/// Build a fragment stream over a body of byte chunks
///
/// `idle_timeout_ms` bounds the wait for each chunk; exceeding it ends the
/// stream with a transport error.
pub fn fragment_stream<S, B, E>(body: S, idle_timeout_ms: Option<u64>) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    Box::pin(fragments(body, idle_timeout_ms))
}

fn fragments<S, B, E>(
    body: S,
    idle_timeout_ms: Option<u64>,
) -> impl Stream<Item = ChatResult<String>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    try_stream! {
        let mut body = Box::pin(body);
        let mut parser = FrameParser::new();

        loop {
            let next = match idle_timeout_ms {
                Some(idle_ms) => with_timeout(body.next(), idle_ms)
                    .await
                    .map_err(|e| ChatError::transport(format!("stream stalled: {}", e)))?,
                None => body.next().await,
            };
            let Some(chunk) = next else {
                break;
            };
            let chunk =
                chunk.map_err(|e| ChatError::transport(format!("stream read failed: {}", e)))?;

            for payload in parser.feed(chunk.as_ref()) {
                trace!("stream payload: {}", payload);
                if let Some(fragment) = extract_delta(&payload) {
                    yield fragment;
                }
            }

            if parser.is_finished() {
                debug!("stream terminated by sentinel");
                break;
            }
        }

        if let Some(tail) = parser.finish() {
            debug!("discarding unterminated stream tail ({} bytes)", tail.len());
        }
    }
}

/// Drain a fragment stream into the assembled reply
pub async fn collect_fragments(mut stream: FragmentStream) -> ChatResult<String> {
    let mut reply = String::new();
    while let Some(fragment) = stream.next().await {
        reply.push_str(&fragment?);
    }
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunk(content: &str) -> String {
        format!(
            "data: {}\n",
            serde_json::json!({ "choices": [{ "delta": { "content": content } }] })
        )
    }

    fn body(reads: Vec<Vec<u8>>) -> impl Stream<Item = Result<Vec<u8>, std::io::Error>> {
        stream::iter(reads.into_iter().map(Ok))
    }

    async fn fragments_of(reads: Vec<Vec<u8>>) -> Vec<ChatResult<String>> {
        fragment_stream(body(reads), None).collect().await
    }

    #[tokio::test]
    async fn test_two_reads_assemble_hello() {
        let reads = vec![
            br#"data: {"choices":[{"delta":{"content":"Hel"}}]}
"#
            .to_vec(),
            br#"data: {"choices":[{"delta":{"content":"lo"}}]}
data: [DONE]
"#
            .to_vec(),
        ];

        let fragments: Vec<String> = fragments_of(reads)
            .await
            .into_iter()
            .map(|f| f.unwrap())
            .collect();
        assert_eq!(fragments, vec!["Hel", "lo"]);
        assert_eq!(fragments.concat(), "Hello");
    }

    #[tokio::test]
    async fn test_done_ignores_trailing_data() {
        let read = format!("{}data: [DONE]\n{}", chunk("a"), chunk("b"));
        let fragments = fragments_of(vec![read.into_bytes(), chunk("c").into_bytes()]).await;
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].as_deref().unwrap(), "a");
    }

    #[tokio::test]
    async fn test_end_of_body_without_sentinel() {
        let fragments = fragments_of(vec![chunk("x").into_bytes()]).await;
        assert_eq!(fragments.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_frames_are_skipped() {
        let read = format!(
            ": OPENROUTER PROCESSING\n\ndata: {{broken\n{}data: {{\"choices\":[]}}\n{}",
            chunk("ok"),
            chunk("go")
        );
        let fragments: Vec<String> = fragments_of(vec![read.into_bytes()])
            .await
            .into_iter()
            .map(|f| f.unwrap())
            .collect();
        assert_eq!(fragments, vec!["ok", "go"]);
    }

    #[tokio::test]
    async fn test_read_error_ends_stream_after_yielded_fragments() {
        let reads: Vec<Result<Vec<u8>, std::io::Error>> = vec![
            Ok(chunk("kept").into_bytes()),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            Ok(chunk("never").into_bytes()),
        ];
        let items: Vec<ChatResult<String>> =
            fragment_stream(stream::iter(reads), None).collect().await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_deref().unwrap(), "kept");
        assert!(items[1].as_ref().unwrap_err().is_transport_error());
    }

    #[tokio::test]
    async fn test_idle_timeout_is_transport_error() {
        let stalled = stream::pending::<Result<Vec<u8>, std::io::Error>>();
        let mut fragments = fragment_stream(stalled, Some(15));
        let err = fragments.next().await.unwrap().unwrap_err();
        assert!(err.is_transport_error());
        assert!(err.to_string().contains("after 15ms"));
        assert!(fragments.next().await.is_none());
    }

    #[tokio::test]
    async fn test_idle_timeout_allows_steady_reads() {
        let reads = vec![chunk("a").into_bytes(), chunk("b").into_bytes()];
        let fragments: Vec<String> = fragment_stream(body(reads), Some(u64::MAX))
            .map(|f| f.unwrap())
            .collect()
            .await;
        assert_eq!(fragments, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_collect_fragments_propagates_error() {
        let reads: Vec<Result<Vec<u8>, std::io::Error>> = vec![
            Ok(chunk("partial").into_bytes()),
            Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof")),
        ];
        let result = collect_fragments(fragment_stream(stream::iter(reads), None)).await;
        assert!(result.is_err());
    }
}
