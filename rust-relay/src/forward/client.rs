//! HTTP client for the analytics `events.track` endpoint.

use std::sync::Arc;

use reqwest::{header, Client};
use serde_json::Value;
use tracing::{error, info};
use url::Url;

use crate::config::{Config, PropertiesMode};
use crate::payload::PayloadSchema;

use super::error::ForwardError;
use super::event::{build_event, AnalyticsEvent};

/// Path of the ingestion endpoint, relative to the configured base URL.
pub const TRACK_PATH: &str = "events.track";

/// Sends tracked events to the analytics API.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Clone)]
pub struct Forwarder {
    client: Client,
    endpoint: Url,
    api_key: Option<Arc<str>>,
    schema: PayloadSchema,
    properties_mode: PropertiesMode,
}

impl Forwarder {
    /// Create a forwarder from the loaded configuration.
    ///
    /// The outbound timeout comes from `REQUEST_TIMEOUT_MS`.
    pub fn new(config: &Config) -> Result<Self, ForwardError> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;

        Ok(Self {
            client,
            endpoint: track_endpoint(&config.api_url),
            api_key: config.api_key.as_deref().map(Arc::from),
            schema: PayloadSchema::new(config.payload_schema),
            properties_mode: config.properties_mode,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Reshape `payload` and deliver it.
    ///
    /// Refuses to send without an API key or a resolvable email. Every
    /// failure is logged here at error level.
    pub async fn forward(&self, payload: &Value) -> Result<AnalyticsEvent, ForwardError> {
        let Some(api_key) = self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
        else {
            error!("analytics_send_skipped_missing_api_key");
            return Err(ForwardError::MissingApiKey);
        };

        let event = build_event(&self.schema, self.properties_mode, payload).map_err(|e| {
            error!(error = %e, "analytics_send_skipped_missing_email");
            e
        })?;

        info!(
            event_name = %event.name,
            email = %event.email,
            property_count = event.properties.len(),
            endpoint = %self.endpoint,
            "analytics_send_starting"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .bearer_auth(api_key)
            .json(&event)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    error!(event_name = %event.name, error = %e, "analytics_send_timeout");
                } else {
                    error!(event_name = %event.name, error = %e, "analytics_send_error");
                }
                ForwardError::Transport(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                event_name = %event.name,
                status_code = status.as_u16(),
                body = %body,
                "analytics_send_rejected"
            );
            return Err(ForwardError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(
            event_name = %event.name,
            status_code = status.as_u16(),
            "analytics_send_complete"
        );

        Ok(event)
    }
}

/// Append the track path to the base URL, keeping any base path segments.
fn track_endpoint(base: &Url) -> Url {
    let mut endpoint = base.clone();
    let path = format!("{}/{}", base.path().trim_end_matches('/'), TRACK_PATH);
    endpoint.set_path(&path);
    endpoint
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| {
            vars.iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        })
        .unwrap()
    }

    #[test]
    fn test_track_endpoint_joins_base_path() {
        let cases = [
            ("https://api.example.com", "https://api.example.com/events.track"),
            ("https://api.example.com/", "https://api.example.com/events.track"),
            ("https://api.example.com/v1", "https://api.example.com/v1/events.track"),
            ("https://api.example.com/v1/", "https://api.example.com/v1/events.track"),
        ];
        for (base, expected) in cases {
            let url = Url::parse(base).unwrap();
            assert_eq!(track_endpoint(&url).as_str(), expected);
        }
    }

    #[tokio::test]
    async fn test_forward_without_api_key_is_refused() {
        let forwarder = Forwarder::new(&config(&[])).unwrap();
        let payload = serde_json::json!({
            "payload": {
                "notification_name": "Workspace Created",
                "data": {"owner_email": "owner@example.com"}
            }
        });

        let err = forwarder.forward(&payload).await.unwrap_err();
        assert!(matches!(err, ForwardError::MissingApiKey));
    }

    #[test]
    fn test_forwarder_uses_configured_url() {
        let forwarder =
            Forwarder::new(&config(&[("ANALYTICS_API_URL", "http://127.0.0.1:9/base")])).unwrap();
        assert_eq!(forwarder.endpoint().as_str(), "http://127.0.0.1:9/base/events.track");
    }
}
