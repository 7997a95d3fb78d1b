//! OpenAI SSE stream fold.
//!
//! Drains `async-openai`'s [`ChatCompletionResponseStream`] into a single
//! [`CompletionOutcome`]: text deltas accumulate, the last `finish_reason`
//! seen supplies the stop reason.

use futures_util::StreamExt;

use async_openai::types::chat::{ChatCompletionResponseStream, FinishReason};

use relaybot_types::llm::{CompletionOutcome, ProviderError, StopReason};

/// Map an OpenAI `finish_reason` to the provider-agnostic stop reason.
pub(super) fn map_finish_reason(finish: FinishReason) -> StopReason {
    match finish {
        FinishReason::Stop => StopReason::EndTurn,
        FinishReason::Length => StopReason::MaxTokens,
        FinishReason::ToolCalls => StopReason::ToolUse,
        FinishReason::ContentFilter => StopReason::EndTurn,
        FinishReason::FunctionCall => StopReason::ToolUse,
    }
}

/// Drain a chat completion stream into one outcome.
///
/// A stream that produced no text at all is reported as malformed rather
/// than handed to the caller as an empty reply.
pub async fn collect_stream(
    mut stream: ChatCompletionResponseStream,
) -> Result<CompletionOutcome, ProviderError> {
    let mut text = String::new();
    let mut stop_reason = StopReason::EndTurn;

    while let Some(result) = stream.next().await {
        let chunk = result.map_err(super::map_openai_error)?;

        for choice in &chunk.choices {
            if let Some(ref content) = choice.delta.content {
                text.push_str(content);
            }
            if let Some(finish) = choice.finish_reason {
                stop_reason = map_finish_reason(finish);
            }
        }
    }

    if text.is_empty() {
        return Err(ProviderError::MalformedResponse(
            "stream ended without any text content".to_string(),
        ));
    }

    Ok(CompletionOutcome::from_stop_reason(text, stop_reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(map_finish_reason(FinishReason::Stop), StopReason::EndTurn);
        assert_eq!(
            map_finish_reason(FinishReason::Length),
            StopReason::MaxTokens
        );
        assert_eq!(
            map_finish_reason(FinishReason::ToolCalls),
            StopReason::ToolUse
        );
        assert_eq!(
            map_finish_reason(FinishReason::ContentFilter),
            StopReason::EndTurn
        );
    }

    #[test]
    fn test_length_means_truncated() {
        let outcome = CompletionOutcome::from_stop_reason(
            "partial".to_string(),
            map_finish_reason(FinishReason::Length),
        );
        assert!(outcome.truncated);
    }
}
