//! Web server module for receiving Coder webhooks.
//!
//! Routes:
//! - `GET /`: liveness message
//! - `GET /health`: health check
//! - `POST /`: Coder notification webhook

pub mod handlers;

use axum::{routing::get, Router};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

pub use handlers::{
    coder_webhook, health, panic_response, root, AppState, HealthResponse, MessageResponse,
    WebhookResponse, SERVICE_MESSAGE,
};

/// Build the relay's router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root).post(coder_webhook))
        .route("/health", get(health))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
