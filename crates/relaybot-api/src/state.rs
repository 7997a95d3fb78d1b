//! Application state shared by the HTTP handlers.
//!
//! The composition root in `main` wires the store, engine, dispatcher, and
//! transport into one [`Orchestrator`]; handlers only ever see that.

use std::sync::Arc;

use relaybot_core::orchestrator::Orchestrator;
use relaybot_infra::delivery::WebhookTransport;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator<WebhookTransport>>,
}
