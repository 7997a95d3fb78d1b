//! Per-user conversation histories and the shared system prompt.
//!
//! The store maps user identifiers (case-sensitive) to independently locked
//! histories. New-user seeding always copies the *current* system message;
//! changing the template never rewrites existing histories.
//!
//! Appending to a user that was never seeded is an error by contract --
//! callers go through [`ConversationStore::get_or_create`] first, which the
//! orchestrator enforces. This replaces the original's silently-ignoring
//! dictionary write with an explicit API.

use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use tokio::sync::Mutex;

use relaybot_types::error::ConversationError;
use relaybot_types::llm::Message;

/// Ordered, append-only message sequence owned by one user.
pub type History = Vec<Message>;

/// A user's history behind its own lock.
///
/// The lock is a tokio `Mutex` because it is held across provider-call
/// awaits to keep one user's turns strictly ordered.
pub type SharedHistory = Arc<Mutex<History>>;

/// Mapping from user identifier to conversation history, plus the shared
/// system message template used to seed first contacts.
pub struct ConversationStore {
    histories: DashMap<String, SharedHistory>,
    system_message: RwLock<String>,
}

impl ConversationStore {
    /// Create a store seeding future users from `system_prompt`.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            histories: DashMap::new(),
            system_message: RwLock::new(system_prompt.into()),
        }
    }

    /// Return the user's history, creating and seeding it on first contact.
    ///
    /// Idempotent: repeated calls for the same user return the same shared
    /// handle, never an independent copy. Always succeeds.
    pub fn get_or_create(&self, user: &str) -> SharedHistory {
        self.histories
            .entry(user.to_string())
            .or_insert_with(|| {
                let seed = self
                    .system_message
                    .read()
                    .expect("system message lock poisoned")
                    .clone();
                tracing::debug!(user, "seeding conversation history");
                Arc::new(Mutex::new(vec![Message::system(seed)]))
            })
            .clone()
    }

    /// Append a message to an existing user's history.
    ///
    /// # Errors
    ///
    /// [`ConversationError::UnknownUser`] if the user was never seeded via
    /// [`Self::get_or_create`].
    pub async fn append(&self, user: &str, message: Message) -> Result<(), ConversationError> {
        let history = self
            .histories
            .get(user)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ConversationError::UnknownUser(user.to_string()))?;

        history.lock().await.push(message);
        Ok(())
    }

    /// Replace the system message template for *future* first contacts.
    ///
    /// Existing histories keep the template they were seeded with.
    pub fn set_system_message(&self, text: impl Into<String>) {
        *self
            .system_message
            .write()
            .expect("system message lock poisoned") = text.into();
    }

    /// The current system message template.
    pub fn system_message(&self) -> String {
        self.system_message
            .read()
            .expect("system message lock poisoned")
            .clone()
    }

    /// Whether the user has been seen before.
    pub fn contains(&self, user: &str) -> bool {
        self.histories.contains_key(user)
    }

    /// Number of users with a seeded history.
    pub fn user_count(&self) -> usize {
        self.histories.len()
    }
}
