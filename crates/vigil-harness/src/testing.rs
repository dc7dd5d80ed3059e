//! In-process provider for unit tests

use std::sync::Mutex;

use async_trait::async_trait;
use vigil_llm::types::{Choice, ChoiceMessage, FinishReason, StreamDelta};
use vigil_llm::{
    CompletionRequest, CompletionResponse, CompletionStream, LlmError, Provider, ProviderCapabilities, StreamEvent,
};

type Respond = Box<dyn Fn(&CompletionRequest) -> Result<CompletionResponse, LlmError> + Send + Sync>;

/// Answers every request through a closure and records what it was sent
///
/// Streams are the same answer split into word-sized deltas.
pub struct ScriptedProvider {
    respond: Respond,
    truncate_streams: bool,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new(respond: impl Fn(&CompletionRequest) -> Result<CompletionResponse, LlmError> + Send + Sync + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            truncate_streams: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with `text` and the given finish reason
    pub fn replying(text: &'static str, finish_reason: FinishReason) -> Self {
        Self::new(move |request| Ok(text_response(&request.model, text, finish_reason)))
    }

    /// Always fails with the error built by `make_err`
    pub fn failing(make_err: fn() -> LlmError) -> Self {
        Self::new(move |_| Err(make_err()))
    }

    /// Drop the terminal delta from streams
    pub const fn truncating(mut self) -> Self {
        self.truncate_streams = true;
        self
    }

    pub fn last_request(&self) -> CompletionRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

pub fn text_response(model: &str, text: &str, finish_reason: FinishReason) -> CompletionResponse {
    CompletionResponse {
        id: "scripted".to_owned(),
        created: 0,
        model: model.to_owned(),
        choices: vec![Choice {
            index: 0,
            message: ChoiceMessage::text(text.to_owned()),
            finish_reason: Some(finish_reason),
        }],
        usage: None,
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            streaming: true,
            tool_calling: true,
            vision: true,
        }
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        (self.respond)(request)
    }

    async fn complete_stream(&self, request: &CompletionRequest) -> Result<CompletionStream, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        let response = (self.respond)(request)?;
        let choice = &response.choices[0];

        let mut events: Vec<Result<StreamEvent, LlmError>> = choice
            .text()
            .split_inclusive(' ')
            .map(|word| Ok(StreamEvent::Delta(StreamDelta::text(word))))
            .collect();

        if !self.truncate_streams
            && let Some(reason) = choice.finish_reason
        {
            events.push(Ok(StreamEvent::Delta(StreamDelta::finish(reason))));
        }
        events.push(Ok(StreamEvent::Done));

        Ok(Box::pin(futures_util::stream::iter(events)))
    }
}
