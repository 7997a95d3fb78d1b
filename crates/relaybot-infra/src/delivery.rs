//! Webhook transport for outbound chunks.
//!
//! Implements [`ChatTransport`] over a plain JSON webhook: each chunk is
//! POSTed as `{destination, content}`. HTTP 429 responses are translated
//! into [`SendFault::RateLimited`] with the wait from the `Retry-After`
//! header so the dispatcher can back off and retry.

use std::time::Duration;

use serde::Serialize;

use relaybot_core::delivery::ChatTransport;
use relaybot_types::error::SendFault;

/// Wait applied when the platform rate-limits without a `Retry-After`
/// header.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
struct WebhookBody<'a> {
    destination: &'a str,
    content: &'a str,
}

/// Sends chunks to a messaging platform webhook.
#[derive(Debug, Clone)]
pub struct WebhookTransport {
    client: reqwest::Client,
    webhook_url: String,
}

impl WebhookTransport {
    pub fn new(webhook_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            webhook_url,
        }
    }
}

impl ChatTransport for WebhookTransport {
    async fn send(&self, destination: &str, chunk: &str) -> Result<(), SendFault> {
        let body = WebhookBody {
            destination,
            content: chunk,
        };

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SendFault::Transport(format!("webhook request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_RETRY_AFTER);
            return Err(SendFault::RateLimited(retry_after));
        }

        let error_body = response.text().await.unwrap_or_default();
        Err(SendFault::Transport(format!(
            "webhook HTTP {status}: {error_body}"
        )))
    }
}
