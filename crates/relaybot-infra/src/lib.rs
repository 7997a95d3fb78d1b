//! Infrastructure implementations for Relaybot.
//!
//! Concrete [`relaybot_core::llm::ChatBackend`] variants (Anthropic,
//! OpenAI-compatible, generic HTTP agent, tool-augmented wrapper), the
//! webhook delivery transport, and the YAML configuration loader.

pub mod config;
pub mod delivery;
pub mod llm;
