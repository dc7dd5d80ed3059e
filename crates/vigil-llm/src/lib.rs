//! Chat-completion client for vigil
//!
//! Provides a provider-agnostic request/response model, an AWS Bedrock
//! Converse provider (the Nova family's home), an OpenAI-compatible provider,
//! a retry wrapper and a `provider/model` router.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod client;
pub mod convert;
pub mod error;
pub mod protocol;
pub mod provider;
pub mod stop;
pub mod tool_names;
pub mod types;

pub use client::{LlmClient, ResolvedModel};
pub use error::{ErrorKind, LlmError};
pub use provider::retry::{RetryPolicy, RetryingProvider};
pub use provider::{CompletionStream, Provider, ProviderCapabilities};
pub use types::{CompletionRequest, CompletionResponse, StreamEvent};
