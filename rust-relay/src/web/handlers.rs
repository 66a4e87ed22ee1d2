//! HTTP endpoint handlers.
//!
//! The webhook handler forwards synchronously and always acknowledges a
//! well-formed body with 200, whether or not the event was tracked or
//! delivered.

use std::any::Any;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, info};

use crate::config::Config;
use crate::forward::Forwarder;
use crate::relay::Relay;

/// Message returned by the liveness endpoint.
pub const SERVICE_MESSAGE: &str = "Hello from Coder middleware";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub relay: Relay,
}

impl AppState {
    pub fn new(config: Config, forwarder: Forwarder) -> Self {
        let config = Arc::new(config);
        Self {
            relay: Relay::new(config.clone(), forwarder),
            config,
        }
    }
}

// =============================================================================
// Liveness and Health
// =============================================================================

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Liveness endpoint.
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: SERVICE_MESSAGE,
    })
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint. Does not contact the analytics API.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

// =============================================================================
// Coder Webhook
// =============================================================================

/// Webhook response.
#[derive(Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WebhookResponse {
    pub fn received() -> Self {
        Self {
            status: "received",
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: Some(message.into()),
        }
    }
}

/// Coder webhook endpoint.
///
/// The body is read as raw bytes so that a malformed payload yields the
/// relay's own 500 response instead of axum's JSON rejection.
pub async fn coder_webhook(State(state): State<AppState>, body: Bytes) -> Response {
    info!(
        body_length = body.len(),
        payload_schema = %state.config.payload_schema,
        "coder_webhook_received"
    );

    match state.relay.handle_body(&body).await {
        Ok(outcome) => {
            info!(forwarded = outcome.is_forwarded(), "coder_webhook_handled");
            (StatusCode::OK, Json(WebhookResponse::received())).into_response()
        }
        Err(e) => {
            error!(error = %e, "coder_webhook_invalid");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(WebhookResponse::error(e.to_string())),
            )
                .into_response()
        }
    }
}

/// Turn a handler panic into the same 500 body as any other failure.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    error!(panic = %detail, "request_handler_panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(WebhookResponse::error(format!("internal error: {detail}"))),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::capture::LogBuffer;

    fn state(vars: &[(&str, &str)]) -> AppState {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let config = Config::from_lookup(|name| {
            vars.iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        })
        .unwrap();
        let forwarder = Forwarder::new(&config).unwrap();
        AppState::new(config, forwarder)
    }

    #[tokio::test]
    async fn test_webhook_logs_payload_schema() {
        let logs = LogBuffer::default();
        let _guard = tracing::subscriber::set_default(logs.subscriber());

        let response = coder_webhook(
            State(state(&[("PAYLOAD_SCHEMA", "flat")])),
            Bytes::from_static(br#"{"notification_name": "Template Updated"}"#),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let output = logs.contents();
        assert!(output.contains("coder_webhook_received"), "{output}");
        assert!(output.contains(r#""payload_schema":"flat""#), "{output}");
    }

    #[test]
    fn test_webhook_response_shapes() {
        let received = serde_json::to_value(WebhookResponse::received()).unwrap();
        assert_eq!(received, serde_json::json!({"status": "received"}));

        let failed = serde_json::to_value(WebhookResponse::error("bad body")).unwrap();
        assert_eq!(
            failed,
            serde_json::json!({"status": "error", "message": "bad body"})
        );
    }

    #[test]
    fn test_panic_response_is_500() {
        let response = panic_response(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = panic_response(Box::new(42_u8));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
