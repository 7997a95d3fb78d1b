//! Configuration and per-provider defaults for OpenAI-compatible backends.
//!
//! Each provider that speaks the OpenAI chat completions protocol gets a
//! factory function returning an [`OpenAiCompatConfig`] with the correct
//! base URL.

/// Configuration for an OpenAI-compatible chat backend.
///
/// Used to construct an [`super::OpenAiCompatBackend`].
pub struct OpenAiCompatConfig {
    /// Human-readable provider name (e.g., "openai", "perplexity").
    pub provider_name: String,
    /// Base URL for the API (e.g., "https://api.openai.com/v1").
    pub base_url: String,
    /// API key for authentication.
    pub api_key: String,
}

/// OpenAI default configuration.
///
/// Base URL: `https://api.openai.com/v1`
pub fn openai_defaults(api_key: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "openai".into(),
        base_url: "https://api.openai.com/v1".into(),
        api_key: api_key.into(),
    }
}

/// Perplexity default configuration.
///
/// Perplexity exposes the OpenAI chat completions protocol directly at its
/// API root, so the base URL carries no `/v1` suffix.
pub fn perplexity_defaults(api_key: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "perplexity".into(),
        base_url: "https://api.perplexity.ai".into(),
        api_key: api_key.into(),
    }
}
