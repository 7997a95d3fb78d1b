//! SSE event handling for the Anthropic Messages API.
//!
//! The Messages API streams responses as server-sent events. Each event
//! carries a name (`message_start`, `content_block_delta`, ...) and a JSON
//! payload. This module folds that event sequence into a single
//! [`CompletionOutcome`]: text deltas accumulate, the `message_delta` event
//! supplies the stop reason, and `error` events abort the fold.

use futures_util::StreamExt;

use eventsource_stream::Eventsource;
use relaybot_types::llm::{CompletionOutcome, ProviderError, StopReason};

use super::types::{AnthropicDelta, ContentBlockDeltaPayload, ErrorPayload, MessageDeltaPayload};

/// Accumulator for the SSE fold.
#[derive(Debug, Default)]
struct StreamState {
    text: String,
    stop_reason: Option<StopReason>,
    done: bool,
}

/// Process one named SSE event into the accumulator.
///
/// Returns `Err` only for `error` events and undecodable payloads; unknown
/// event names are skipped so new server-side event types don't break the
/// parse.
fn process_event(
    event_name: &str,
    json_data: &str,
    state: &mut StreamState,
) -> Result<(), ProviderError> {
    match event_name {
        "content_block_delta" => {
            let payload: ContentBlockDeltaPayload = serde_json::from_str(json_data)
                .map_err(|e| ProviderError::MalformedResponse(format!("content_block_delta: {e}")))?;
            if let AnthropicDelta::TextDelta { text } = payload.delta {
                state.text.push_str(&text);
            }
            // Thinking, tool-input and signature deltas don't surface in the
            // final reply text.
        }

        "message_delta" => {
            let payload: MessageDeltaPayload = serde_json::from_str(json_data)
                .map_err(|e| ProviderError::MalformedResponse(format!("message_delta: {e}")))?;
            state.stop_reason = match payload.delta.stop_reason.as_deref() {
                Some("end_turn") => Some(StopReason::EndTurn),
                Some("max_tokens") => Some(StopReason::MaxTokens),
                Some("stop_sequence") => Some(StopReason::StopSequence),
                Some("tool_use") => Some(StopReason::ToolUse),
                Some(_) | None => state.stop_reason,
            };
        }

        "message_stop" => {
            state.done = true;
        }

        "error" => {
            let payload: ErrorPayload = serde_json::from_str(json_data)
                .map_err(|e| ProviderError::MalformedResponse(format!("error event: {e}")))?;
            let err = match payload.error.error_type.as_str() {
                "authentication_error" | "permission_error" => ProviderError::Auth,
                "rate_limit_error" => ProviderError::RateLimited {
                    retry_after_ms: None,
                },
                _ => ProviderError::Network(format!(
                    "{}: {}",
                    payload.error.error_type, payload.error.message
                )),
            };
            return Err(err);
        }

        "message_start" | "content_block_start" | "content_block_stop" | "ping" => {}

        unknown => {
            tracing::debug!(event = unknown, "unknown Anthropic SSE event, skipping");
        }
    }

    Ok(())
}

/// Drain the SSE body of a successful Messages API response into one outcome.
///
/// The fold ends at `message_stop` or when the connection closes. A stream
/// that produced no text at all is reported as malformed rather than handed
/// to the caller as an empty reply.
pub async fn collect_completion(response: reqwest::Response) -> Result<CompletionOutcome, ProviderError> {
    let mut events = response.bytes_stream().eventsource();
    let mut state = StreamState::default();

    while let Some(event) = events.next().await {
        let event =
            event.map_err(|e| ProviderError::Network(format!("SSE stream read: {e}")))?;
        process_event(&event.event, &event.data, &mut state)?;
        if state.done {
            break;
        }
    }

    if state.text.is_empty() {
        return Err(ProviderError::MalformedResponse(
            "stream ended without any text content".to_string(),
        ));
    }

    Ok(CompletionOutcome::from_stop_reason(
        state.text,
        state.stop_reason.unwrap_or(StopReason::EndTurn),
    ))
}
