use serde::{Deserialize, Serialize};

use super::message::{FunctionCall, Role, ToolCall};

/// Reason the model stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of generation or a stop sequence
    Stop,
    /// Hit the `max_tokens` limit
    Length,
    /// Model decided to call a tool
    ToolCalls,
    /// Content was filtered by safety systems
    ContentFilter,
}

impl FinishReason {
    /// Wire name of the reason
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Length => "length",
            Self::ToolCalls => "tool_calls",
            Self::ContentFilter => "content_filter",
        }
    }

    /// Parse a wire name, accepting the Anthropic/Bedrock spellings too
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "stop" | "end_turn" | "stop_sequence" => Some(Self::Stop),
            "length" | "max_tokens" => Some(Self::Length),
            "tool_calls" | "tool_use" => Some(Self::ToolCalls),
            "content_filter" | "content_filtered" => Some(Self::ContentFilter),
            _ => None,
        }
    }
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token accounting reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// One generated alternative
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: ChoiceMessage,
    /// `None` when the provider did not say why it stopped
    pub finish_reason: Option<FinishReason>,
}

impl Choice {
    /// Text content, empty when the model produced none
    pub fn text(&self) -> &str {
        self.message.content.as_deref().unwrap_or_default()
    }
}

/// Assistant turn produced by a completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceMessage {
    pub role: Role,
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl ChoiceMessage {
    pub const fn new(content: Option<String>, tool_calls: Option<Vec<ToolCall>>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls,
        }
    }

    pub fn text(content: String) -> Self {
        Self::new(Some(content), None)
    }

    pub fn with_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self::new(None, Some(tool_calls))
    }
}

/// Provider-agnostic completion result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub id: String,
    /// Unix seconds
    pub created: u64,
    /// Model id as the caller named it
    pub model: String,
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl CompletionResponse {
    pub fn first_choice(&self) -> Option<&Choice> {
        self.choices.first()
    }

    /// Tool calls across every choice, in choice order
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.choices
            .iter()
            .filter_map(|choice| choice.message.tool_calls.as_deref())
            .flatten()
    }
}

/// Build a tool call from raw parts
pub fn build_tool_call(id: String, name: String, arguments: String) -> ToolCall {
    ToolCall {
        id,
        function: FunctionCall { name, arguments },
    }
}

/// Seconds since the Unix epoch, zero if the clock is before it
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
