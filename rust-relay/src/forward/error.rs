//! Error types for forwarding an event.
//!
//! None of these reach the inbound caller; the relay logs them and still
//! acknowledges the webhook.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForwardError {
    /// No API key is configured.
    #[error("analytics API key is not configured")]
    MissingApiKey,

    /// No target email could be derived from the payload.
    #[error("no target email resolvable for event {event_name:?}")]
    MissingEmail {
        /// Event name as received
        event_name: String,
    },

    /// The request could not be built or sent.
    #[error("analytics request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The analytics API answered with a non-2xx status.
    #[error("analytics API rejected event: HTTP {status}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },
}
