use super::response::{FinishReason, Usage};

/// Event delivered while streaming a completion
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Incremental content for one choice
    Delta(StreamDelta),
    /// Token accounting, usually after the final delta
    Usage(Usage),
    /// Provider signalled the end of the stream
    Done,
}

/// Incremental update within a streaming response
///
/// A delta carries at most one tool-call fragment; providers that batch
/// several fragments into one frame emit one delta per fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamDelta {
    /// Choice index this delta belongs to
    pub index: u32,
    pub content: Option<String>,
    pub tool_call: Option<StreamToolCall>,
    /// Present on the terminal delta only
    pub finish_reason: Option<FinishReason>,
}

impl StreamDelta {
    /// Text-only delta for choice 0
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Terminal delta for choice 0
    pub fn finish(reason: FinishReason) -> Self {
        Self {
            finish_reason: Some(reason),
            ..Self::default()
        }
    }

    /// Tool-call fragment for choice 0
    pub fn tool_call(fragment: StreamToolCall) -> Self {
        Self {
            tool_call: Some(fragment),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.tool_call.is_none() && self.finish_reason.is_none()
    }
}

/// Fragment of one tool call
///
/// The first fragment for an `index` carries the id and name; later ones
/// append to `arguments`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamToolCall {
    /// Position of the call within the choice's tool calls
    pub index: u32,
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: Option<String>,
}

impl StreamToolCall {
    /// Opening fragment naming the call
    pub fn start(index: u32, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            index,
            id: Some(id.into()),
            name: Some(name.into()),
            arguments: None,
        }
    }

    /// Continuation fragment with more argument JSON
    pub fn arguments(index: u32, fragment: impl Into<String>) -> Self {
        Self {
            index,
            arguments: Some(fragment.into()),
            ..Self::default()
        }
    }
}
