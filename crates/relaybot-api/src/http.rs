//! Inbound HTTP surface.
//!
//! Two routes: `POST /v1/events` accepts a platform event and queues it for
//! processing (202 Accepted -- the reply travels through the outbound
//! webhook, not this response), and `GET /healthz` reports readiness.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// An inbound `(username, text)` event from the messaging platform.
#[derive(Debug, Deserialize)]
pub struct InboundEvent {
    pub username: String,
    pub text: String,
}

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Request payload failed validation.
    Validation(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
        };

        let body = json!({
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Build the router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/events", post(accept_event))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `POST /v1/events` -- queue an event and return immediately.
///
/// Per-user ordering is the orchestrator's concern; the handler never
/// blocks on the completion.
async fn accept_event(
    State(state): State<AppState>,
    axum::Json(event): axum::Json<InboundEvent>,
) -> Result<StatusCode, AppError> {
    if event.username.trim().is_empty() {
        return Err(AppError::Validation("username is empty".to_string()));
    }
    if event.text.trim().is_empty() {
        return Err(AppError::Validation("text is empty".to_string()));
    }

    state.orchestrator.spawn_event(event.username, event.text);
    Ok(StatusCode::ACCEPTED)
}

/// `GET /healthz` -- 200 while the provider is usable, 503 after a
/// credential rejection.
async fn healthz(State(state): State<AppState>) -> Response {
    if state.orchestrator.is_ready() {
        (StatusCode::OK, axum::Json(json!({"status": "ok"}))).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            axum::Json(json!({"status": "provider unavailable"})),
        )
            .into_response()
    }
}
