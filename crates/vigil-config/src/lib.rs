//! Configuration for the vigil contract harness
//!
//! A single TOML file describes the providers to talk to, the model/case
//! matrix to run, harness behaviour and logging.

#![allow(clippy::must_use_candidate)]

mod env;
pub mod harness;
pub mod llm;
mod loader;
pub mod matrix;
pub mod telemetry;

use serde::Deserialize;

pub use env::ExpandError;
pub use harness::*;
pub use llm::*;
pub use matrix::*;
pub use telemetry::*;

/// Top-level vigil configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Harness behaviour
    #[serde(default)]
    pub harness: HarnessConfig,
    /// Chat-completion providers
    #[serde(default)]
    pub llm: LlmConfig,
    /// Models and fixtures to exercise
    #[serde(default)]
    pub matrix: MatrixConfig,
    /// Logging setup
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}
