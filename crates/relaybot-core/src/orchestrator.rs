//! Orchestrator -- composition root for the relay core.
//!
//! Receives inbound `(username, text)` events, runs the completion engine,
//! and hands the result to the delivery dispatcher. One tokio task per
//! event; events from the same user are serialized through a per-user
//! ordering lock while different users proceed fully in parallel.
//!
//! Engine failures are converted into a short, non-leaking user-visible
//! notice and delivered through the same dispatcher path -- never dropped
//! silently.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use relaybot_types::llm::ProviderError;

use crate::conversation::ConversationStore;
use crate::delivery::{ChatTransport, DeliveryDispatcher};
use crate::engine::CompletionEngine;

/// Wires the store, engine, and dispatcher together and owns the
/// per-event task lifecycle.
pub struct Orchestrator<T: ChatTransport> {
    store: Arc<ConversationStore>,
    engine: CompletionEngine,
    dispatcher: DeliveryDispatcher<T>,
    destination: String,
    user_locks: DashMap<String, Arc<Mutex<()>>>,
    ready: AtomicBool,
    cancel: CancellationToken,
    tasks: TaskTracker,
}

impl<T: ChatTransport + 'static> Orchestrator<T> {
    pub fn new(
        store: Arc<ConversationStore>,
        engine: CompletionEngine,
        dispatcher: DeliveryDispatcher<T>,
        destination: String,
    ) -> Self {
        Self {
            store,
            engine,
            dispatcher,
            destination,
            user_locks: DashMap::new(),
            ready: AtomicBool::new(true),
            cancel: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }

    /// Whether the orchestrator can currently serve completions.
    ///
    /// Flips to false on a credential rejection; the provider is unusable
    /// until reconfigured.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// The shared conversation store.
    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    /// Process one inbound event end to end.
    ///
    /// Holds the user's ordering lock for the whole turn so a user's
    /// messages complete strictly in arrival order.
    pub async fn handle_event(&self, user: &str, text: &str) {
        let lock = self
            .user_locks
            .entry(user.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _ordering = lock.lock().await;

        tracing::info!(user, backend = self.engine.backend_name(), "chat event");

        let reply = match self.engine.run(user, text).await {
            Ok(reply) => reply,
            Err(err) => {
                if matches!(err, ProviderError::Auth) {
                    self.ready.store(false, Ordering::SeqCst);
                }
                tracing::error!(user, error = %err, "completion failed");
                failure_notice(&err).to_string()
            }
        };

        if let Err(err) = self.dispatcher.send(&self.destination, &reply).await {
            tracing::error!(user, destination = %self.destination, error = %err, "delivery failed");
        }
    }

    /// Spawn one task for an inbound event.
    pub fn spawn_event(self: &Arc<Self>, user: String, text: String) {
        if self.cancel.is_cancelled() {
            tracing::warn!(user, "shutting down, event dropped");
            return;
        }
        let this = self.clone();
        self.tasks.spawn(async move {
            this.handle_event(&user, &text).await;
        });
    }

    /// Stop accepting events and wait up to `grace` for in-flight turns.
    pub async fn shutdown(&self, grace: Duration) {
        self.cancel.cancel();
        self.tasks.close();
        if tokio::time::timeout(grace, self.tasks.wait()).await.is_err() {
            tracing::warn!(grace_ms = grace.as_millis() as u64, "shutdown grace expired with tasks in flight");
        }
    }
}

/// Short user-facing notice for an engine failure.
///
/// Never echoes credentials, endpoints, or raw error bodies.
fn failure_notice(err: &ProviderError) -> &'static str {
    match err {
        ProviderError::Auth => {
            "My language model rejected my credentials; an operator needs to reconfigure me."
        }
        ProviderError::RateLimited { .. } => {
            "The language model is rate limiting me, give me a moment and ask again."
        }
        ProviderError::Network(_) => {
            "I could not reach the language model, please try again shortly."
        }
        ProviderError::MalformedResponse(_) => {
            "The language model sent back something I could not read, please try again."
        }
    }
}
