//! Rebuild a completion response from a streamed event sequence

use std::collections::BTreeMap;

use futures_util::StreamExt;
use vigil_llm::types::{Choice, ChoiceMessage, FinishReason, StreamDelta, ToolCall, Usage, build_tool_call, unix_now};
use vigil_llm::{CompletionResponse, CompletionStream, StreamEvent};

use crate::error::HarnessError;

#[derive(Debug, Default)]
struct PartialToolCall {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

/// Accumulates stream events in arrival order
///
/// Content deltas are concatenated, tool-call fragments are merged by their
/// index and the first delta carrying a finish reason closes the sequence.
/// Usage and `Done` events after the close are still accepted.
#[derive(Debug, Default)]
pub struct StreamAssembler {
    content: String,
    tool_calls: BTreeMap<u32, PartialToolCall>,
    usage: Option<Usage>,
    finish_reason: Option<FinishReason>,
    events: usize,
}

impl StreamAssembler {
    /// Feed one event
    pub fn push(&mut self, event: StreamEvent) {
        self.events += 1;
        match event {
            StreamEvent::Delta(delta) => self.push_delta(delta),
            StreamEvent::Usage(usage) => self.usage = Some(usage),
            StreamEvent::Done => {}
        }
    }

    fn push_delta(&mut self, delta: StreamDelta) {
        if self.finish_reason.is_some() {
            tracing::debug!(?delta, "ignoring delta after finish reason");
            return;
        }

        if let Some(content) = delta.content {
            self.content.push_str(&content);
        }

        if let Some(fragment) = delta.tool_call {
            let partial = self.tool_calls.entry(fragment.index).or_default();
            if partial.id.is_none() {
                partial.id = fragment.id;
            }
            if partial.name.is_none() {
                partial.name = fragment.name;
            }
            if let Some(arguments) = fragment.arguments {
                partial.arguments.push_str(&arguments);
            }
        }

        self.finish_reason = delta.finish_reason;
    }

    /// Whether a terminal delta has been seen
    pub const fn is_finished(&self) -> bool {
        self.finish_reason.is_some()
    }

    /// Content accumulated so far
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Build the logical response
    ///
    /// # Errors
    ///
    /// Returns `HarnessError::IncompleteStream` if no finish reason arrived.
    pub fn finish(self, model: &str) -> Result<CompletionResponse, HarnessError> {
        let Some(finish_reason) = self.finish_reason else {
            return Err(HarnessError::IncompleteStream { events: self.events });
        };

        let tool_calls: Vec<ToolCall> = self
            .tool_calls
            .into_iter()
            .map(|(index, partial)| {
                build_tool_call(
                    partial.id.unwrap_or_else(|| format!("call_{index}")),
                    partial.name.unwrap_or_default(),
                    partial.arguments,
                )
            })
            .collect();

        let message = ChoiceMessage::new(
            (!self.content.is_empty()).then_some(self.content),
            (!tool_calls.is_empty()).then_some(tool_calls),
        );

        Ok(CompletionResponse {
            id: format!("stream-{}", unix_now()),
            created: unix_now(),
            model: model.to_owned(),
            choices: vec![Choice {
                index: 0,
                message,
                finish_reason: Some(finish_reason),
            }],
            usage: self.usage,
        })
    }
}

/// Drain `stream` and rebuild the response
///
/// # Errors
///
/// Returns the first provider error raised mid-stream, or
/// `HarnessError::IncompleteStream` if the stream ends without a finish reason.
pub async fn reassemble(mut stream: CompletionStream, model: &str) -> Result<CompletionResponse, HarnessError> {
    let mut assembler = StreamAssembler::default();
    while let Some(event) = stream.next().await {
        assembler.push(event?);
    }
    assembler.finish(model)
}
