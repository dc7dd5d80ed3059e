//! OpenAI-compatible provider implementation

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use url::Url;
use vigil_config::LlmProviderConfig;

use super::{CompletionStream, Provider, ProviderCapabilities};
use crate::convert::openai::chunk_events;
use crate::error::LlmError;
use crate::protocol::openai::{ChatChunk, ChatRequest, ChatResponse, ErrorEnvelope, StreamOptions};
use crate::types::{CompletionRequest, CompletionResponse, StreamEvent};

/// Default `OpenAI` API base URL
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible provider
pub struct OpenAiProvider {
    name: String,
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
}

impl OpenAiProvider {
    /// Create from provider configuration
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Internal` if no base URL is configured and the
    /// default cannot be parsed.
    pub fn new(name: String, config: &LlmProviderConfig) -> Result<Self, LlmError> {
        let base_url = match &config.base_url {
            Some(url) => url.clone(),
            None => Url::parse(DEFAULT_BASE_URL).map_err(|e| LlmError::Internal(e.into()))?,
        };

        Ok(Self {
            name,
            client: Client::new(),
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    /// Build the chat completions URL
    fn completions_url(&self) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/chat/completions")
    }

    /// Only the canonical API is sent `stream_options`; many compatible
    /// servers reject the unknown parameter
    fn is_canonical_openai(&self) -> bool {
        self.base_url.host_str() == Some("api.openai.com")
    }

    async fn send(&self, wire_request: &ChatRequest<'_>) -> Result<reqwest::Response, LlmError> {
        let mut builder = self.client.post(self.completions_url()).json(wire_request);

        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!(provider = %self.name, error = %e, "upstream request failed");
            LlmError::Upstream(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(provider = %self.name, status = %status, "upstream returned error");
        Err(classify_status(status, &body))
    }
}

/// Map an HTTP error status and body onto the crate's error taxonomy
///
/// The provider's own message is kept when the body is an `OpenAI` error
/// envelope; otherwise the raw body is used.
fn classify_status(status: StatusCode, body: &str) -> LlmError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_owned());
    let detail = format!("provider returned {status}: {message}");

    match status {
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited { message: detail },
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
            LlmError::InvalidRequest(detail)
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::Unauthorized(detail),
        s if s.is_server_error() => LlmError::ProviderInternal(detail),
        _ => LlmError::Upstream(detail),
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            streaming: true,
            tool_calling: true,
            vision: true,
        }
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let response = self.send(&ChatRequest::from(request)).await?;

        let wire_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Upstream(format!("failed to parse response: {e}")))?;

        Ok(wire_response.into())
    }

    async fn complete_stream(&self, request: &CompletionRequest) -> Result<CompletionStream, LlmError> {
        let mut wire_request = ChatRequest::from(request);
        wire_request.stream = Some(true);
        wire_request.stream_options = self
            .is_canonical_openai()
            .then_some(StreamOptions { include_usage: true });

        let response = self.send(&wire_request).await?;

        let mapped = response
            .bytes_stream()
            .eventsource()
            .map(|result| match result {
                Ok(event) => {
                    let data = event.data.trim();
                    if data == "[DONE]" {
                        return vec![Ok(StreamEvent::Done)];
                    }

                    match serde_json::from_str::<ChatChunk>(data) {
                        Ok(chunk) => chunk_events(chunk).into_iter().map(Ok).collect(),
                        Err(e) => {
                            tracing::debug!(error = %e, data = %data, "skipping unparseable SSE chunk");
                            vec![]
                        }
                    }
                }
                Err(e) => vec![Err(LlmError::Streaming(e.to_string()))],
            })
            .flat_map(futures_util::stream::iter);

        Ok(Box::pin(mapped))
    }
}
