//! OpenRouter-compatible completion client
//!
//! Every request is a `POST {base_url}/chat/completions` carrying a bearer
//! key plus the `HTTP-Referer` and `X-Title` attribution headers.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;
use tracing::{debug, warn};

use super::types::{CompletionRequest, CompletionResponse};
use super::CompletionProvider;
use crate::config::ProviderConfig;
use crate::conversation::Message;
use crate::error::{ChatError, ChatResult};
use crate::network::TimeoutConfig;
use crate::streaming::{clean_reply, fragment_stream, FragmentStream};

const FAILED_RESPONSE: &str = "Failed to get response from AI";

/// HTTP client for an OpenRouter-compatible endpoint
#[derive(Debug, Clone)]
pub struct CompletionClient {
    client: reqwest::Client,
    url: String,
    model: String,
    request_timeout: Duration,
    idle_timeout_ms: u64,
}

impl CompletionClient {
    /// Build a client; fails when no API key is configured
    pub fn new(provider: &ProviderConfig, timeouts: &TimeoutConfig) -> ChatResult<Self> {
        let api_key = provider.require_api_key()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", api_key))?);
        headers.insert(
            HeaderName::from_static("http-referer"),
            header_value(&provider.referer)?,
        );
        headers.insert(
            HeaderName::from_static("x-title"),
            header_value(&provider.title)?,
        );

        // No client-wide timeout: it would cut long streams short.
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(timeouts.connect_duration())
            .build()
            .map_err(|e| ChatError::config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: provider.completions_url(),
            model: provider.model.clone(),
            request_timeout: timeouts.request_duration(),
            idle_timeout_ms: timeouts.idle,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(
        &self,
        body: &CompletionRequest<'_>,
        timeout: Option<Duration>,
    ) -> ChatResult<reqwest::Response> {
        let mut request = self.client.post(&self.url).json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        debug!(
            "POST {} model={} messages={} stream={}",
            self.url,
            body.model,
            body.messages.len(),
            body.stream.unwrap_or(false)
        );

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!("completion endpoint returned {}: {}", status, detail);
            return Err(ChatError::status(status.as_u16(), FAILED_RESPONSE));
        }

        Ok(response)
    }
}

fn header_value(value: &str) -> ChatResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| ChatError::config(format!("invalid header value: {}", e)))
}

#[async_trait]
impl CompletionProvider for CompletionClient {
    async fn stream_completion(&self, messages: &[Message]) -> ChatResult<FragmentStream> {
        let body = CompletionRequest::new(&self.model, messages).streaming();
        let response = self.post(&body, None).await?;
        Ok(fragment_stream(
            response.bytes_stream(),
            Some(self.idle_timeout_ms),
        ))
    }

    async fn send_completion(&self, messages: &[Message]) -> ChatResult<String> {
        let body = CompletionRequest::new(&self.model, messages);
        let response = self.post(&body, Some(self.request_timeout)).await?;

        let text = response
            .text()
            .await
            .map_err(|e| ChatError::transport(format!("failed to read body: {}", e)))?;
        let parsed: CompletionResponse = serde_json::from_str(&text)
            .map_err(|e| ChatError::Decode(format!("invalid completion body: {}", e)))?;
        let content = parsed
            .first_content()
            .ok_or_else(|| ChatError::Decode("completion has no message content".to_string()))?;

        Ok(clean_reply(content))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base_url: &str) -> ProviderConfig {
        ProviderConfig {
            api_key: Some("sk-test".to_string()),
            base_url: base_url.to_string(),
            model: "test/model".to_string(),
            referer: "http://localhost:5173".to_string(),
            title: "Kichat".to_string(),
        }
    }

    fn client(server: &MockServer) -> CompletionClient {
        CompletionClient::new(&provider(&server.uri()), &TimeoutConfig::default()).unwrap()
    }

    #[test]
    fn test_missing_api_key() {
        let config = ProviderConfig::default();
        let err = CompletionClient::new(&config, &TimeoutConfig::default()).unwrap_err();
        assert!(matches!(err, ChatError::Config(_)));
    }

    #[test]
    fn test_url_built_from_base() {
        let client =
            CompletionClient::new(&provider("http://host/api/v1/"), &TimeoutConfig::default())
                .unwrap();
        assert_eq!(client.url(), "http://host/api/v1/chat/completions");
        assert_eq!(client.model(), "test/model");
    }

    #[tokio::test]
    async fn test_sends_attribution_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(header("http-referer", "http://localhost:5173"))
            .and(header("x-title", "Kichat"))
            .and(body_partial_json(serde_json::json!({"model": "test/model"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "  <|begin_of_sentence|>Hi! \n"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client(&server)
            .send_completion(&[Message::user("hello")])
            .await
            .unwrap();
        assert_eq!(reply, "Hi!");
    }

    #[tokio::test]
    async fn test_streams_fragments() {
        let server = MockServer::start().await;
        let body = concat!(
            ": OPENROUTER PROCESSING\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({"stream": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let stream = client(&server)
            .stream_completion(&[Message::user("hello")])
            .await
            .unwrap();
        let fragments: Vec<String> = stream.map(|f| f.unwrap()).collect().await;
        assert_eq!(fragments, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn test_non_success_status_fails_before_streaming() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let err = client(&server)
            .stream_completion(&[Message::user("hello")])
            .await
            .err()
            .unwrap();
        match err {
            ChatError::Transport { status, message } => {
                assert_eq!(status, Some(429));
                assert_eq!(message, FAILED_RESPONSE);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_choice_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let err = client(&server)
            .send_completion(&[Message::user("hello")])
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Decode(_)));
    }
}
