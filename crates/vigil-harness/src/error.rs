use std::path::PathBuf;

use thiserror::Error;
use vigil_llm::LlmError;

/// Response property a contract check asserts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Check {
    /// At least one choice was returned
    HasChoices,
    /// Choice 0 carries non-empty text
    NonEmptyContent,
    /// Word count stays below the configured ceiling
    WordLimit,
    /// Content ends with the expected stop sequence
    StopSequence,
    /// Tool-call names equal the requested names
    ToolNameFidelity,
}

impl Check {
    /// Stable name used in logs and reports
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HasChoices => "has_choices",
            Self::NonEmptyContent => "non_empty_content",
            Self::WordLimit => "word_limit",
            Self::StopSequence => "stop_sequence",
            Self::ToolNameFidelity => "tool_name_fidelity",
        }
    }
}

impl std::fmt::Display for Check {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A response that broke the completion contract
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("contract check `{check}` failed: {detail}")]
pub struct ContractViolation {
    /// Which check failed
    pub check: Check,
    /// What the response looked like
    pub detail: String,
}

impl ContractViolation {
    pub(crate) fn new(check: Check, detail: impl Into<String>) -> Self {
        Self {
            check,
            detail: detail.into(),
        }
    }
}

/// Errors that fail a harness operation
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The client returned an error the failure policy does not tolerate
    #[error("error occurred: {0}")]
    Provider(#[from] LlmError),

    /// The response broke the contract
    #[error(transparent)]
    Contract(#[from] ContractViolation),

    /// A streamed response ended without a finish reason
    #[error("stream ended after {events} events without a finish reason")]
    IncompleteStream {
        /// Events consumed before the stream ended
        events: usize,
    },

    /// Operation was called with inputs it cannot send
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Fixture file could not be read
    #[error("failed to read fixture {}: {source}", path.display())]
    Fixture {
        /// Fixture location
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },
}
