//! Provider trait and implementations for chat-completion backends

pub mod bedrock;
pub mod openai;
pub mod retry;

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::error::LlmError;
use crate::types::{CompletionRequest, CompletionResponse, StreamEvent};

/// Boxed stream of completion events
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send>>;

/// Capabilities advertised by a provider
#[derive(Debug, Clone)]
pub struct ProviderCapabilities {
    /// Whether the provider supports streaming responses
    pub streaming: bool,
    /// Whether the provider supports tool/function calling
    pub tool_calling: bool,
    /// Whether the provider accepts inline image parts
    pub vision: bool,
}

/// Trait implemented by each chat-completion backend
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable provider name
    fn name(&self) -> &str;

    /// Advertised capabilities
    fn capabilities(&self) -> ProviderCapabilities;

    /// Send a non-streaming completion request
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Send a streaming completion request
    async fn complete_stream(&self, request: &CompletionRequest) -> Result<CompletionStream, LlmError>;
}
