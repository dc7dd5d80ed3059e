use serde::{Deserialize, Serialize};

use super::message::Message;
use super::tool::{ToolChoice, ToolDefinition};

/// Stop sequences, accepted either as one string or as an ordered list
///
/// Serializes back in the shape it was given, matching the `OpenAI` wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StopSequences {
    /// A single stop string
    One(String),
    /// Ordered candidate stop strings
    Many(Vec<String>),
}

impl StopSequences {
    /// All candidates in order
    pub fn as_slice(&self) -> &[String] {
        match self {
            Self::One(seq) => std::slice::from_ref(seq),
            Self::Many(seqs) => seqs,
        }
    }

    /// The canonical expected terminator (first candidate)
    pub fn first(&self) -> Option<&str> {
        self.as_slice().first().map(String::as_str)
    }

    /// Whether no usable candidate is present
    pub fn is_empty(&self) -> bool {
        self.as_slice().iter().all(String::is_empty)
    }
}

impl From<&str> for StopSequences {
    fn from(seq: &str) -> Self {
        Self::One(seq.to_owned())
    }
}

impl From<Vec<String>> for StopSequences {
    fn from(seqs: Vec<String>) -> Self {
        Self::Many(seqs)
    }
}

/// Parameters controlling text generation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionParams {
    /// Sampling temperature (0.0 to 1.0 for Nova)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Top-k sampling cutoff
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Stop sequences
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopSequences>,
}

/// Internal canonical completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier
    pub model: String,
    /// Conversation messages
    pub messages: Vec<Message>,
    /// Generation parameters
    #[serde(default)]
    pub params: CompletionParams,
    /// Tool definitions available to the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    /// How the model should select tools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    /// Whether to stream the response
    #[serde(default)]
    pub stream: bool,
}

impl CompletionRequest {
    /// Request with default parameters
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            params: CompletionParams::default(),
            tools: None,
            tool_choice: None,
            stream: false,
        }
    }

    /// Stop candidates, if any were supplied
    pub fn stop_sequences(&self) -> &[String] {
        self.params.stop.as_ref().map_or(&[], StopSequences::as_slice)
    }
}
