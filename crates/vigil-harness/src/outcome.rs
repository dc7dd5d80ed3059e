//! Operation outcomes and the failure policy

use vigil_llm::{CompletionResponse, ErrorKind};

use crate::error::HarnessError;

/// Result of a harness operation that did not fail
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Every contract check passed
    Verified(CompletionResponse),
    /// The client failed in a way the operation tolerates
    Tolerated {
        /// Classified failure
        kind: ErrorKind,
        /// Original error message
        message: String,
    },
}

impl Outcome {
    /// Whether the response was checked and passed
    pub const fn is_verified(&self) -> bool {
        matches!(self, Self::Verified(_))
    }

    /// Verified response, if any
    pub const fn response(&self) -> Option<&CompletionResponse> {
        match self {
            Self::Verified(response) => Some(response),
            Self::Tolerated { .. } => None,
        }
    }
}

/// Set of client error kinds an operation swallows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tolerance(&'static [ErrorKind]);

impl Tolerance {
    /// Throttling only
    pub const RATE_LIMITED: Self = Self(&[ErrorKind::RateLimited]);

    /// Throttling plus the provider's own transient faults
    pub const TRANSIENT_PROVIDER_FAULT: Self = Self(&[ErrorKind::RateLimited, ErrorKind::ProviderInternal]);

    /// Whether `kind` is swallowed
    pub fn tolerates(self, kind: ErrorKind) -> bool {
        self.0.contains(&kind)
    }

    /// Turn a checked result into an outcome
    ///
    /// Only client errors are candidates; contract violations, incomplete
    /// streams and bad inputs always fail.
    pub fn settle(self, result: Result<CompletionResponse, HarnessError>) -> Result<Outcome, HarnessError> {
        match result {
            Ok(response) => Ok(Outcome::Verified(response)),
            Err(HarnessError::Provider(err)) if self.tolerates(err.kind()) => {
                tracing::warn!(kind = %err.kind(), error = %err, "tolerated provider error");
                Ok(Outcome::Tolerated {
                    kind: err.kind(),
                    message: err.to_string(),
                })
            }
            Err(err) => Err(err),
        }
    }
}
