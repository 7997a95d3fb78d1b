//! Shared domain types for Relaybot.
//!
//! This crate contains the types used across the relay: conversation
//! messages, normalized completion requests and outcomes, the token budget
//! schedule, configuration, and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, secrecy, thiserror.

pub mod config;
pub mod error;
pub mod llm;
pub mod schedule;
