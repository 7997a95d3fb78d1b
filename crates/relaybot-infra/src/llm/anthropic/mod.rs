//! Anthropic Claude chat backend.
//!
//! This module provides the [`AnthropicBackend`] which implements the
//! [`ChatBackend`](relaybot_core::llm::ChatBackend) trait for the Anthropic
//! Messages API, with the response consumed as an SSE stream.

pub mod client;
pub mod streaming;
pub mod types;

pub use client::AnthropicBackend;
