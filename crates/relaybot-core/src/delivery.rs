//! DeliveryDispatcher -- chunked, ordered outbound delivery.
//!
//! Platforms impose a hard per-message size limit and hand back rate-limit
//! signals with a wait duration. The dispatcher splits a finished reply
//! into chunks (preferring line boundaries over mid-word cuts), sends them
//! strictly in order, and retries a rate-limited chunk exactly once after
//! the signaled wait. A second rate limit on the same chunk, or any other
//! transport failure, surfaces immediately.

use relaybot_types::error::{DeliveryError, SendFault};

/// Outbound side of the messaging platform client.
///
/// One call delivers one chunk to one destination. The platform's
/// rate-limit signal carries the wait it demands.
pub trait ChatTransport: Send + Sync {
    fn send(
        &self,
        destination: &str,
        chunk: &str,
    ) -> impl std::future::Future<Output = Result<(), SendFault>> + Send;
}

/// Split `text` into chunks of at most `limit` characters.
///
/// Prefers to cut just after the last line break inside the window so
/// sentences and formatting survive; falls back to a hard cut at the
/// character limit. Chunks concatenate back to the original text exactly.
pub fn split_chunks(text: &str, limit: usize) -> Vec<String> {
    debug_assert!(limit > 0);
    let mut chunks = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let mut chars = 0usize;
        let mut hard_split = None;
        let mut newline_split = None;

        for (idx, ch) in rest.char_indices() {
            if chars == limit {
                hard_split = Some(idx);
                break;
            }
            if ch == '\n' {
                newline_split = Some(idx + 1);
            }
            chars += 1;
        }

        match hard_split {
            None => {
                chunks.push(rest.to_string());
                break;
            }
            Some(hard) => {
                let split = newline_split.unwrap_or(hard);
                chunks.push(rest[..split].to_string());
                rest = &rest[split..];
            }
        }
    }

    chunks
}

/// Sends finished replies through a [`ChatTransport`], honoring the
/// platform's size limit and rate-limit backoff.
pub struct DeliveryDispatcher<T: ChatTransport> {
    transport: T,
    chunk_limit: usize,
}

impl<T: ChatTransport> DeliveryDispatcher<T> {
    pub fn new(transport: T, chunk_limit: usize) -> Self {
        Self {
            transport,
            chunk_limit,
        }
    }

    /// Deliver `text` to `destination`, chunked and in order.
    ///
    /// # Errors
    ///
    /// [`DeliveryError::RateLimited`] when a chunk is rate-limited twice in
    /// a row; [`DeliveryError::Transport`] for any other send failure.
    pub async fn send(&self, destination: &str, text: &str) -> Result<(), DeliveryError> {
        for chunk in split_chunks(text, self.chunk_limit) {
            self.send_chunk(destination, &chunk).await?;
        }
        Ok(())
    }

    async fn send_chunk(&self, destination: &str, chunk: &str) -> Result<(), DeliveryError> {
        match self.transport.send(destination, chunk).await {
            Ok(()) => Ok(()),
            Err(SendFault::Transport(msg)) => Err(DeliveryError::Transport(msg)),
            Err(SendFault::RateLimited(wait)) => {
                tracing::warn!(destination, wait_ms = wait.as_millis() as u64, "rate limited, backing off");
                tokio::time::sleep(wait).await;

                match self.transport.send(destination, chunk).await {
                    Ok(()) => Ok(()),
                    Err(SendFault::RateLimited(retry_after)) => {
                        Err(DeliveryError::RateLimited { retry_after })
                    }
                    Err(SendFault::Transport(msg)) => Err(DeliveryError::Transport(msg)),
                }
            }
        }
    }
}
