//! CompletionEngine -- the progressive token-budget retry loop.
//!
//! One invocation walks the token schedule from the smallest ceiling up:
//! a truncated reply advances to the next ceiling, a complete reply ends
//! the loop, and any provider error surfaces immediately (a larger budget
//! cannot fix a transport or auth failure). Ascending rather than
//! descending ceilings keeps spend minimal for short answers while still
//! guaranteeing completeness for long ones.
//!
//! History consistency: the user message is appended before the first
//! attempt and rolled back if the loop fails, and the assistant message
//! is appended only once a final text exists. No error path leaves a
//! half-appended conversation.

use std::sync::Arc;

use relaybot_types::llm::{CompletionRequest, Message, MessageRole, ProviderError};
use relaybot_types::schedule::TokenSchedule;

use crate::conversation::{ConversationStore, History};
use crate::llm::BoxChatBackend;

/// Drives completion attempts against one backend with increasing token
/// ceilings, updating the conversation store with the result.
pub struct CompletionEngine {
    store: Arc<ConversationStore>,
    backend: BoxChatBackend,
    schedule: TokenSchedule,
    model: String,
    temperature: f64,
}

impl CompletionEngine {
    pub fn new(
        store: Arc<ConversationStore>,
        backend: BoxChatBackend,
        schedule: TokenSchedule,
        model: String,
        temperature: f64,
    ) -> Self {
        Self {
            store,
            backend,
            schedule,
            model,
            temperature,
        }
    }

    /// The backend this engine drives.
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Run one completion for an inbound `(user, text)` event.
    ///
    /// Returns the final reply text. On [`Err`] the user's history is left
    /// exactly as it was before the call.
    pub async fn run(&self, user: &str, text: &str) -> Result<String, ProviderError> {
        let history = self.store.get_or_create(user);
        let mut guard = history.lock().await;

        // Attribution keeps multi-user context unambiguous for the model.
        guard.push(Message::user(format!("{user} says {text}")));

        let mut last_truncated: Option<String> = None;
        let mut last_ceiling = self.schedule.min;

        for ceiling in self.schedule.ceilings() {
            let request = self.build_request(&guard, ceiling);
            tracing::debug!(
                user,
                backend = self.backend.name(),
                ceiling,
                "completion attempt"
            );

            match self.backend.complete(&request).await {
                Ok(outcome) if !outcome.truncated => {
                    tracing::info!(user, ceiling, chars = outcome.text.len(), "completion done");
                    guard.push(Message::assistant(outcome.text.clone()));
                    return Ok(outcome.text);
                }
                Ok(outcome) => {
                    tracing::debug!(user, ceiling, "reply truncated, raising ceiling");
                    last_truncated = Some(outcome.text);
                    last_ceiling = ceiling;
                }
                Err(err) => {
                    // Roll back the pending user message; the turn never
                    // happened as far as the history is concerned.
                    guard.pop();
                    tracing::warn!(user, ceiling, error = %err, "completion failed");
                    return Err(err);
                }
            }
        }

        // Schedule exhausted while still truncated. Never return a cut-off
        // answer without signaling it.
        let body = last_truncated.unwrap_or_default();
        let notice = format!("[reply truncated at the {last_ceiling}-token budget] {body}");
        tracing::warn!(user, ceiling = last_ceiling, "token schedule exhausted");
        guard.push(Message::assistant(notice.clone()));
        Ok(notice)
    }

    /// Build a normalized request from the locked history.
    ///
    /// Leading system messages are lifted into the `system` field so that
    /// backends which separate the system prompt from the turn list get it
    /// where they expect it; backends which inline it re-merge.
    fn build_request(&self, history: &History, ceiling: u32) -> CompletionRequest {
        let system: Vec<&str> = history
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
            .collect();

        let messages: Vec<Message> = history
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .cloned()
            .collect();

        CompletionRequest {
            model: self.model.clone(),
            messages,
            system: if system.is_empty() {
                None
            } else {
                Some(system.join("\n"))
            },
            max_tokens: ceiling,
            temperature: Some(self.temperature),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use relaybot_types::llm::CompletionOutcome;

    use crate::llm::ChatBackend;

    /// Backend stub that replays scripted outcomes and records ceilings.
    struct ScriptedBackend {
        script: Mutex<VecDeque<Result<CompletionOutcome, ProviderError>>>,
        calls: AtomicUsize,
        ceilings: Mutex<Vec<u32>>,
    }

    impl ScriptedBackend {
        fn new(script: Vec<Result<CompletionOutcome, ProviderError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
                ceilings: Mutex::new(Vec::new()),
            }
        }

        fn truncated(text: &str) -> Result<CompletionOutcome, ProviderError> {
            Ok(CompletionOutcome {
                text: text.into(),
                truncated: true,
            })
        }

        fn complete(text: &str) -> Result<CompletionOutcome, ProviderError> {
            Ok(CompletionOutcome {
                text: text.into(),
                truncated: false,
            })
        }
    }

    impl ChatBackend for Arc<ScriptedBackend> {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<CompletionOutcome, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.ceilings.lock().unwrap().push(request.max_tokens);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("backend called more times than scripted")
        }
    }

    fn engine_with(
        script: Vec<Result<CompletionOutcome, ProviderError>>,
        schedule: TokenSchedule,
    ) -> (CompletionEngine, Arc<ConversationStore>, Arc<ScriptedBackend>) {
        let store = Arc::new(ConversationStore::new("be brief"));
        let backend = Arc::new(ScriptedBackend::new(script));
        let engine = CompletionEngine::new(
            store.clone(),
            BoxChatBackend::new(backend.clone()),
            schedule,
            "test-model".into(),
            0.5,
        );
        (engine, store, backend)
    }

    fn schedule_256_1024() -> TokenSchedule {
        TokenSchedule::new(256, 1024, 256).unwrap()
    }

    #[tokio::test]
    async fn test_single_call_when_first_attempt_completes() {
        let (engine, store, backend) = engine_with(
            vec![ScriptedBackend::complete("short answer")],
            schedule_256_1024(),
        );

        let reply = engine.run("alice", "hi").await.unwrap();
        assert_eq!(reply, "short answer");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*backend.ceilings.lock().unwrap(), vec![256]);

        let history = store.get_or_create("alice");
        let guard = history.lock().await;
        assert_eq!(guard.last().unwrap().content, "short answer");
        assert_eq!(guard.last().unwrap().role, MessageRole::Assistant);
    }

    #[tokio::test]
    async fn test_truncation_advances_ceiling_until_done() {
        // Truncates at 256 and 512, succeeds at 768.
        let (engine, store, backend) = engine_with(
            vec![
                ScriptedBackend::truncated("do"),
                ScriptedBackend::truncated("don"),
                ScriptedBackend::complete("done"),
            ],
            schedule_256_1024(),
        );

        let reply = engine.run("alice", "long question").await.unwrap();
        assert_eq!(reply, "done");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
        assert_eq!(*backend.ceilings.lock().unwrap(), vec![256, 512, 768]);

        let history = store.get_or_create("alice");
        let guard = history.lock().await;
        assert_eq!(guard.last().unwrap().content, "done");
    }

    #[tokio::test]
    async fn test_exhausted_schedule_returns_truncation_notice() {
        let (engine, store, backend) = engine_with(
            vec![
                ScriptedBackend::truncated("partial"),
                ScriptedBackend::truncated("partial more"),
                ScriptedBackend::truncated("partial even more"),
            ],
            schedule_256_1024(),
        );

        let reply = engine.run("alice", "epic question").await.unwrap();
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
        assert!(reply.starts_with("[reply truncated at the 768-token budget]"));
        assert!(reply.ends_with("partial even more"));

        // The notice is what lands in the history too.
        let history = store.get_or_create("alice");
        let guard = history.lock().await;
        assert_eq!(guard.last().unwrap().content, reply);
    }

    #[tokio::test]
    async fn test_auth_error_surfaces_without_further_calls() {
        let (engine, store, backend) =
            engine_with(vec![Err(ProviderError::Auth)], schedule_256_1024());

        let err = engine.run("alice", "hi").await.unwrap_err();
        assert!(matches!(err, ProviderError::Auth));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

        // Pending user message rolled back; only the system seed remains.
        let history = store.get_or_create("alice");
        let guard = history.lock().await;
        assert_eq!(guard.len(), 1);
        assert_eq!(guard[0].role, MessageRole::System);
    }

    #[tokio::test]
    async fn test_network_error_does_not_advance_ceiling() {
        let (engine, _store, backend) = engine_with(
            vec![Err(ProviderError::Network("connection refused".into()))],
            schedule_256_1024(),
        );

        let err = engine.run("alice", "hi").await.unwrap_err();
        assert!(matches!(err, ProviderError::Network(_)));
        // One attempt at the first ceiling, no escalation.
        assert_eq!(*backend.ceilings.lock().unwrap(), vec![256]);
    }

    #[tokio::test]
    async fn test_user_message_carries_attribution() {
        let (engine, store, _backend) = engine_with(
            vec![ScriptedBackend::complete("ok")],
            schedule_256_1024(),
        );

        engine.run("alice", "what time is it").await.unwrap();

        let history = store.get_or_create("alice");
        let guard = history.lock().await;
        assert_eq!(guard[1].content, "alice says what time is it");
    }

    #[tokio::test]
    async fn test_system_prompt_lifted_out_of_turn_list() {
        let store = Arc::new(ConversationStore::new("be brief"));
        let backend = Arc::new(ScriptedBackend::new(vec![ScriptedBackend::complete("ok")]));
        let engine = CompletionEngine::new(
            store.clone(),
            BoxChatBackend::new(backend.clone()),
            schedule_256_1024(),
            "test-model".into(),
            0.5,
        );

        let history = store.get_or_create("alice");
        {
            let guard = history.lock().await;
            let request = engine.build_request(&guard, 256);
            assert_eq!(request.system.as_deref(), Some("be brief"));
            assert!(request.messages.iter().all(|m| m.role != MessageRole::System));
        }
    }
}
