//! Shared helpers for integration tests

#![allow(dead_code)]

pub mod config;
pub mod mock_llm;
