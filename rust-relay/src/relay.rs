//! Per-request webhook handling: parse, filter, forward.
//!
//! ## Processing Flow
//!
//! ```text
//! body bytes → JSON object → event name → allow-list check → Forwarder
//! ```
//!
//! Only malformed bodies surface as errors. Filtering and forwarding failures
//! are logged and reported through [`Outcome`].

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::forward::{ForwardError, Forwarder};
use crate::payload::PayloadSchema;

/// Errors that make a webhook request fail with HTTP 500.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("webhook body must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// What happened to one webhook.
#[derive(Debug)]
pub enum Outcome {
    /// Event is not in the allow-list
    Ignored { event_name: String },
    /// Event was sent to the analytics API
    Forwarded { event_name: String },
    /// Event was tracked but could not be delivered
    Failed {
        event_name: String,
        error: ForwardError,
    },
}

impl Outcome {
    pub fn is_forwarded(&self) -> bool {
        matches!(self, Outcome::Forwarded { .. })
    }
}

/// Shared webhook handler.
#[derive(Clone)]
pub struct Relay {
    config: Arc<Config>,
    schema: PayloadSchema,
    forwarder: Forwarder,
}

impl Relay {
    pub fn new(config: Arc<Config>, forwarder: Forwarder) -> Self {
        Self {
            schema: PayloadSchema::new(config.payload_schema),
            config,
            forwarder,
        }
    }

    /// Parse a raw body and relay it.
    pub async fn handle_body(&self, body: &[u8]) -> Result<Outcome, RelayError> {
        let payload: Value = serde_json::from_slice(body)?;
        if !payload.is_object() {
            return Err(RelayError::NotAnObject(json_kind(&payload)));
        }
        Ok(self.handle(&payload).await)
    }

    /// Filter a parsed payload and forward it when tracked.
    pub async fn handle(&self, payload: &Value) -> Outcome {
        let event_name = self.schema.event_name(payload).unwrap_or_default().to_string();

        debug!(payload = %payload, "webhook_payload");

        if !self.config.events_tracked.contains(&event_name) {
            info!(event_name = %event_name, "webhook_event_not_tracked");
            debug!(
                events_tracked = ?self.config.events_tracked.as_slice(),
                "webhook_events_tracked"
            );
            return Outcome::Ignored { event_name };
        }

        info!(event_name = %event_name, "webhook_event_tracked");

        match self.forwarder.forward(payload).await {
            Ok(_) => {
                info!(event_name = %event_name, "webhook_event_forwarded");
                Outcome::Forwarded { event_name }
            }
            Err(e) => {
                // Details were logged by the forwarder
                info!(event_name = %event_name, "webhook_event_not_forwarded");
                Outcome::Failed {
                    event_name,
                    error: e,
                }
            }
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
