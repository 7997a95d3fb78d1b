//! ChatBackend trait definition.
//!
//! The single capability every backend variant provides: turn one
//! normalized request into one normalized outcome. Streaming, retries at
//! the wire level, and tool round-trips are all internal to the
//! implementation -- the engine only ever sees `complete`.

use relaybot_types::llm::{CompletionOutcome, CompletionRequest, ProviderError};

/// Trait for LLM backend variants (Anthropic, OpenAI-style, HTTP agent...).
///
/// Uses native async fn in traits (RPITIT). Implementations live in
/// `relaybot-infra`; dynamic dispatch goes through
/// [`super::box_backend::BoxChatBackend`].
///
/// Contract notes:
/// - `complete` must report a reply cut off at `max_tokens` as
///   `truncated = true`, never as a natural end.
/// - An empty or undecodable response body is
///   [`ProviderError::MalformedResponse`], never an empty outcome.
pub trait ChatBackend: Send + Sync {
    /// Human-readable backend name (e.g., "anthropic", "perplexity").
    fn name(&self) -> &str;

    /// Run one completion attempt against the backend.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionOutcome, ProviderError>> + Send;
}
