//! Error taxonomy for conversation state and outbound delivery.
//!
//! Provider-call errors live next to the LLM types in [`crate::llm`];
//! configuration errors next to the config types in [`crate::config`].

use std::time::Duration;

use thiserror::Error;

/// Errors from conversation store operations.
#[derive(Debug, Error)]
pub enum ConversationError {
    /// `append` was called for a user that `get_or_create` never seeded.
    #[error("unknown user '{0}'")]
    UnknownUser(String),
}

/// A single failed transport send, as reported by the platform client.
#[derive(Debug, Error)]
pub enum SendFault {
    /// The platform asked us to wait before sending again.
    #[error("platform rate limited, wait {0:?}")]
    RateLimited(Duration),

    /// Any other transport failure. Not retried.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Errors surfaced by the delivery dispatcher after its retry policy ran.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The platform rate-limited the same chunk twice in a row.
    #[error("delivery rate limited after retry (last wait {retry_after:?})")]
    RateLimited { retry_after: Duration },

    /// Transport failure with no retry budget.
    #[error("delivery transport failure: {0}")]
    Transport(String),
}
