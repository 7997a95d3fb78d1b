//! AnthropicBackend -- concrete [`ChatBackend`] for the Anthropic Messages API.
//!
//! Sends streaming requests to `/v1/messages` with proper authentication
//! headers and folds the SSE body into a single completion.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use relaybot_core::llm::ChatBackend;
use relaybot_types::llm::{CompletionOutcome, CompletionRequest, MessageRole, ProviderError};

use super::streaming::collect_completion;
use super::types::{AnthropicMessage, AnthropicRequest};

/// Anthropic Claude chat backend.
pub struct AnthropicBackend {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl AnthropicBackend {
    /// The Anthropic API version header value.
    const API_VERSION: &'static str = "2023-06-01";

    /// Create a new Anthropic backend.
    pub fn new(api_key: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300)) // 5 min timeout for long generations
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            api_key,
            base_url: "https://api.anthropic.com".to_string(),
        }
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Build the full API URL for a given path.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Convert a generic [`CompletionRequest`] into an [`AnthropicRequest`].
    ///
    /// System-role messages are not valid in the Anthropic `messages` array;
    /// callers lift them into `request.system`, and any stragglers are
    /// filtered here.
    fn to_anthropic_request(&self, request: &CompletionRequest) -> AnthropicRequest {
        let messages = request
            .messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| AnthropicMessage {
                role: m.role.to_string(),
                content: m.content.clone(),
            })
            .collect();

        AnthropicRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens,
            messages,
            system: request.system.clone(),
            stream: true,
            temperature: request.temperature,
        }
    }
}

// AnthropicBackend intentionally does NOT derive Debug. The SecretString
// field keeps the API key out of accidental prints, and omitting Debug
// entirely removes the temptation.

impl ChatBackend for AnthropicBackend {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionOutcome, ProviderError> {
        let body = self.to_anthropic_request(request);
        let url = self.url("/v1/messages");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", Self::API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_ms = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(|secs| secs * 1000);
            let error_body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %error_body, "Anthropic API error response");
            return Err(match status.as_u16() {
                401 | 403 => ProviderError::Auth,
                429 => ProviderError::RateLimited { retry_after_ms },
                _ => ProviderError::Network(format!("HTTP {status}: {error_body}")),
            });
        }

        collect_completion(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaybot_types::llm::Message;

    fn make_backend() -> AnthropicBackend {
        AnthropicBackend::new(SecretString::from("test-key-not-real"))
    }

    fn make_request() -> CompletionRequest {
        CompletionRequest {
            model: "claude-sonnet-4-20250514".to_string(),
            messages: vec![Message::user("Hello")],
            system: Some("Be helpful".to_string()),
            max_tokens: 1024,
            temperature: Some(0.7),
        }
    }

    #[test]
    fn test_backend_name() {
        assert_eq!(make_backend().name(), "anthropic");
    }

    #[test]
    fn test_to_anthropic_request() {
        let backend = make_backend();
        let req = backend.to_anthropic_request(&make_request());
        assert_eq!(req.model, "claude-sonnet-4-20250514");
        assert!(req.stream);
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.messages[0].role, "user");
        assert_eq!(req.system.as_deref(), Some("Be helpful"));
        assert_eq!(req.max_tokens, 1024);
    }

    #[test]
    fn test_system_messages_filtered_from_array() {
        let backend = make_backend();
        let mut request = make_request();
        request.messages.insert(0, Message::system("stray"));

        let req = backend.to_anthropic_request(&request);
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.messages[0].role, "user");
    }

    #[test]
    fn test_base_url_override() {
        let backend = make_backend().with_base_url("http://localhost:8080".to_string());
        assert_eq!(
            backend.url("/v1/messages"),
            "http://localhost:8080/v1/messages"
        );
    }
}
