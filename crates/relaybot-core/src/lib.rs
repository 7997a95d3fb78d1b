//! Core orchestration logic for Relaybot.
//!
//! This crate is the heart of the relay: per-user conversation state, the
//! progressive-token completion engine, chunked outbound delivery, and the
//! orchestrator that composes them. It performs no I/O of its own --
//! concrete LLM backends and platform transports live in `relaybot-infra`
//! behind the traits defined here.

pub mod conversation;
pub mod delivery;
pub mod engine;
pub mod llm;
pub mod orchestrator;
