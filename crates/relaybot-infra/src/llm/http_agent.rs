//! Generic HTTP agent backend for self-hosted models.
//!
//! Speaks plain JSON-over-POST to an arbitrary endpoint. The request and
//! response shape is selected by [`AgentShape`]: OpenAI-compatible,
//! Anthropic-compatible, or a minimal custom `{prompt, max_length, context}`
//! shape for bare inference servers.
//!
//! Truncation detection is configurable: the response is scanned for
//! `finish_field` and its value is compared against `truncated_value`
//! (defaults `finish_reason` / `"length"`). Self-hosted gateways are not
//! uniform here, so the marker lives in configuration rather than code.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use relaybot_core::llm::ChatBackend;
use relaybot_types::config::{AgentSettings, AgentShape};
use relaybot_types::llm::{CompletionOutcome, CompletionRequest, MessageRole, ProviderError};

/// Chat backend for an arbitrary HTTP inference endpoint.
pub struct HttpAgentBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
    shape: AgentShape,
    finish_field: String,
    truncated_value: String,
}

impl HttpAgentBackend {
    /// Create a new HTTP agent backend.
    ///
    /// `endpoint` is the full URL the JSON body is POSTed to. `api_key`,
    /// when present, is sent as a bearer token.
    pub fn new(endpoint: String, api_key: Option<SecretString>, agent: &AgentSettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            endpoint,
            api_key,
            shape: agent.shape,
            finish_field: agent.finish_field.clone(),
            truncated_value: agent.truncated_value.clone(),
        }
    }

    /// Build the JSON request body for the configured shape.
    fn build_body(&self, request: &CompletionRequest) -> Value {
        match self.shape {
            AgentShape::OpenAiCompatible => {
                let mut messages: Vec<Value> = Vec::new();
                if let Some(ref system) = request.system {
                    messages.push(json!({"role": "system", "content": system}));
                }
                for msg in &request.messages {
                    messages.push(json!({
                        "role": msg.role.to_string(),
                        "content": msg.content,
                    }));
                }
                json!({
                    "model": request.model,
                    "messages": messages,
                    "max_tokens": request.max_tokens,
                    "temperature": request.temperature,
                })
            }
            AgentShape::AnthropicCompatible => {
                let messages: Vec<Value> = request
                    .messages
                    .iter()
                    .filter(|m| m.role != MessageRole::System)
                    .map(|m| json!({"role": m.role.to_string(), "content": m.content}))
                    .collect();
                json!({
                    "model": request.model,
                    "max_tokens": request.max_tokens,
                    "system": request.system,
                    "messages": messages,
                    "temperature": request.temperature,
                })
            }
            AgentShape::Custom => {
                // Last user message is the prompt, everything before it is
                // context the endpoint may use or ignore.
                let prompt_idx = request
                    .messages
                    .iter()
                    .rposition(|m| m.role == MessageRole::User);
                let prompt = prompt_idx
                    .map(|i| request.messages[i].content.clone())
                    .unwrap_or_default();
                let mut context: Vec<Value> = Vec::new();
                if let Some(ref system) = request.system {
                    context.push(json!({"role": "system", "content": system}));
                }
                for (i, msg) in request.messages.iter().enumerate() {
                    if Some(i) != prompt_idx {
                        context.push(json!({
                            "role": msg.role.to_string(),
                            "content": msg.content,
                        }));
                    }
                }
                json!({
                    "prompt": prompt,
                    "max_length": request.max_tokens,
                    "context": context,
                })
            }
        }
    }

    /// Pull the reply text out of the response body for the configured shape.
    fn extract_text(&self, body: &Value) -> Option<String> {
        match self.shape {
            AgentShape::OpenAiCompatible => body
                .pointer("/choices/0/message/content")
                .and_then(Value::as_str)
                .map(str::to_string),
            AgentShape::AnthropicCompatible => match body.get("content") {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Array(_)) => body
                    .pointer("/content/0/text")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            },
            AgentShape::Custom => ["text", "response", "completion"]
                .iter()
                .find_map(|key| body.get(key).and_then(Value::as_str))
                .map(str::to_string),
        }
    }

    /// Whether the response reports a truncated generation.
    ///
    /// Searches for `finish_field` at the top level and one nesting level
    /// down (`choices[0]`, `content`, ...). Deeper nesting is not searched;
    /// gateways that bury the marker further can't be described by a single
    /// field name anyway.
    fn is_truncated(&self, body: &Value) -> bool {
        find_field(body, &self.finish_field, 2)
            .and_then(Value::as_str)
            .is_some_and(|v| v == self.truncated_value)
    }
}

/// Depth-bounded search for a named field in a JSON tree.
///
/// Only objects consume depth; arrays are transparent, so
/// `choices[0].finish_reason` is reachable at depth 2.
fn find_field<'a>(value: &'a Value, name: &str, depth: u8) -> Option<&'a Value> {
    if depth == 0 {
        return None;
    }
    match value {
        Value::Object(map) => map
            .get(name)
            .or_else(|| map.values().find_map(|v| find_field(v, name, depth - 1))),
        Value::Array(items) => items.iter().find_map(|v| find_field(v, name, depth)),
        _ => None,
    }
}

// No Debug derive; api_key may be present.

impl ChatBackend for HttpAgentBackend {
    fn name(&self) -> &str {
        "http_agent"
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionOutcome, ProviderError> {
        let body = self.build_body(request);

        let mut req = self.client.post(&self.endpoint).json(&body);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key.expose_secret());
        }

        let response = req
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
            tracing::warn!(status = %status, body = %error_body, "HTTP agent error response");
            return Err(match status.as_u16() {
                401 | 403 => ProviderError::Auth,
                429 => ProviderError::RateLimited { retry_after_ms },
                _ => ProviderError::Network(format!("HTTP {status}: {error_body}")),
            });
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(format!("invalid JSON body: {e}")))?;

        let text = self.extract_text(&json).ok_or_else(|| {
            ProviderError::MalformedResponse("response body has no reply text".to_string())
        })?;
        if text.is_empty() {
            return Err(ProviderError::MalformedResponse(
                "response body has empty reply text".to_string(),
            ));
        }

        let truncated = self.is_truncated(&json);
        Ok(CompletionOutcome { text, truncated })
    }
}
