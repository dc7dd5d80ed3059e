//! Completion contract harness
//!
//! Issues text, system-prompt, streaming, image, tool-calling and
//! stop-sequence requests through any [`vigil_llm::Provider`] and checks the
//! provider-agnostic response contract. [`matrix`] runs the operations over
//! a model × case cross product.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod checks;
mod error;
pub mod fixtures;
mod harness;
mod image;
pub mod matrix;
mod outcome;
mod reassemble;
#[cfg(test)]
mod testing;

pub use error::{Check, ContractViolation, HarnessError};
pub use harness::{Harness, HarnessSettings};
pub use image::{ImageInput, ImageSubtype, data_uri};
pub use matrix::{Case, CaseReport, CaseSpec, CaseStatus, Matrix, Report, run_matrix};
pub use outcome::{Outcome, Tolerance};
pub use reassemble::{StreamAssembler, reassemble};
