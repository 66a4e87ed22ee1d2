//! Configuration module for environment variable parsing.
//!
//! All configuration is read once at startup and shared read-only afterwards.

use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::payload::SchemaVariant;
use crate::util::normalize_event_name;

/// Default destination base URL when `ANALYTICS_API_URL` is unset.
pub const DEFAULT_API_URL: &str = "https://api.analytics.example";

/// Errors that prevent the relay from starting.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid ANALYTICS_API_URL {value:?}: {source}")]
    InvalidApiUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid HOST {value:?}: expected an IP address")]
    InvalidHost {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bearer token for the analytics API; `None` when unset or blank
    pub api_key: Option<String>,

    /// Base URL of the analytics API
    pub api_url: Url,

    /// Normalized allow-list of event names to forward
    pub events_tracked: TrackedEvents,

    /// Logging verbosity
    pub verbosity: Verbosity,

    /// Variables whose values were rejected, as `(name, raw value)`
    pub invalid_vars: Vec<(String, String)>,

    /// Address the web server binds to
    pub host: IpAddr,

    /// Port for the web server to listen on
    pub port: u16,

    /// Outbound HTTP request timeout in milliseconds
    pub request_timeout_ms: u64,

    /// Layout of inbound webhook bodies
    pub payload_schema: SchemaVariant,

    /// How outbound `properties` are assembled
    pub properties_mode: PropertiesMode,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("ANALYTICS_API_KEY")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let api_url = match lookup("ANALYTICS_API_URL").filter(|v| !v.trim().is_empty()) {
            Some(raw) => Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidApiUrl {
                value: raw.clone(),
                source,
            })?,
            None => Url::parse(DEFAULT_API_URL).map_err(|source| ConfigError::InvalidApiUrl {
                value: DEFAULT_API_URL.to_string(),
                source,
            })?,
        };

        // A bad HOST must not silently widen the bind to all interfaces
        let host = match lookup("HOST").filter(|v| !v.trim().is_empty()) {
            Some(raw) => raw
                .trim()
                .parse::<IpAddr>()
                .map_err(|source| ConfigError::InvalidHost {
                    value: raw.clone(),
                    source,
                })?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        let mut invalid_vars = Vec::new();
        let mut vars = VarReader {
            lookup: &lookup,
            invalid: &mut invalid_vars,
        };

        let verbosity = vars.parse_with("LOG_VERBOSITY", Verbosity::parse);
        let port = vars.parse_or("PORT", 8080);
        let request_timeout_ms = vars.parse_where::<u64>("REQUEST_TIMEOUT_MS", 8000, |ms| *ms > 0);
        let payload_schema = vars.parse_with("PAYLOAD_SCHEMA", SchemaVariant::parse);
        let properties_mode = vars.parse_with("PROPERTIES_MODE", PropertiesMode::parse);

        Ok(Config {
            api_key,

            api_url,

            events_tracked: TrackedEvents::from_csv(
                lookup("EVENTS_TRACKED").as_deref().unwrap_or_default(),
            ),

            verbosity,

            invalid_vars,

            host,

            port,

            request_timeout_ms,

            payload_schema,

            properties_mode,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Emit the startup diagnostics describing the resolved configuration.
    ///
    /// Call after logging is initialized.
    pub fn log_summary(&self) {
        for (name, raw) in &self.invalid_vars {
            warn!(env_var = %name, value = %raw, "Invalid value, using default");
        }

        info!(verbosity = %self.verbosity, "log_verbosity_resolved");
        info!(
            events_tracked = ?self.events_tracked.as_slice(),
            count = self.events_tracked.len(),
            "events_tracked_resolved"
        );

        if self.events_tracked.is_empty() {
            warn!("events_tracked_empty_nothing_will_be_forwarded");
        }

        info!(
            bind_addr = %self.bind_addr(),
            api_url = %self.api_url,
            api_key_configured = self.api_key.is_some(),
            request_timeout_ms = self.request_timeout_ms,
            payload_schema = %self.payload_schema,
            properties_mode = %self.properties_mode,
            "config_loaded"
        );

        if self.api_key.is_none() {
            warn!("analytics_api_key_missing_forwarding_disabled");
        }
    }
}

// =============================================================================
// Tracked Events
// =============================================================================

/// Ordered, normalized allow-list of event names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedEvents(Vec<String>);

impl TrackedEvents {
    /// Build from a comma-separated list, normalizing each entry.
    pub fn from_csv(raw: &str) -> Self {
        Self::from_names(raw.split(','))
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut events: Vec<String> = Vec::new();
        for name in names {
            let normalized = normalize_event_name(name.as_ref());
            if normalized.is_empty() {
                continue;
            }
            if !events.contains(&normalized) {
                events.push(normalized);
            }
        }
        TrackedEvents(events)
    }

    /// Whether `event_name` is tracked, comparing normalized forms.
    pub fn contains(&self, event_name: &str) -> bool {
        let normalized = normalize_event_name(event_name);
        if normalized.is_empty() {
            debug!("empty_event_name_never_tracked");
            return false;
        }
        self.0.iter().any(|tracked| *tracked == normalized)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// =============================================================================
// Verbosity
// =============================================================================

/// Named logging level selected by `LOG_VERBOSITY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "quiet" => Some(Self::Quiet),
            "normal" => Some(Self::Normal),
            "verbose" => Some(Self::Verbose),
            _ => None,
        }
    }

    /// The `tracing` filter directive this level maps to.
    pub fn filter_directive(&self) -> &'static str {
        match self {
            Self::Quiet => "warn",
            Self::Normal => "info",
            Self::Verbose => "debug",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quiet => "quiet",
            Self::Normal => "normal",
            Self::Verbose => "verbose",
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Properties Mode
// =============================================================================

/// How the outbound `properties` object is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropertiesMode {
    /// A fixed set of candidate fields
    #[default]
    Fields,
    /// The whole notification with actor fields redacted
    Payload,
}

impl PropertiesMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "fields" => Some(Self::Fields),
            "payload" => Some(Self::Payload),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fields => "fields",
            Self::Payload => "payload",
        }
    }
}

impl fmt::Display for PropertiesMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reads optional variables, recording values that fail to parse.
struct VarReader<'a, F> {
    lookup: &'a F,
    invalid: &'a mut Vec<(String, String)>,
}

impl<F> VarReader<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn raw(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.trim().is_empty())
    }

    /// Parse with `FromStr`, falling back to `default` on bad input.
    fn parse_or<T: FromStr>(&mut self, name: &str, default: T) -> T {
        self.parse_where(name, default, |_| true)
    }

    /// Like `parse_or`, also rejecting values that fail `accept`.
    fn parse_where<T: FromStr>(&mut self, name: &str, default: T, accept: fn(&T) -> bool) -> T {
        let Some(raw) = self.raw(name) else {
            return default;
        };

        match raw.trim().parse() {
            Ok(v) if accept(&v) => v,
            _ => {
                self.invalid.push((name.to_string(), raw));
                default
            }
        }
    }

    /// Parse a named level or mode, falling back to its default.
    fn parse_with<T: Default>(&mut self, name: &str, parse: fn(&str) -> Option<T>) -> T {
        let Some(raw) = self.raw(name) else {
            return T::default();
        };

        parse(&raw).unwrap_or_else(|| {
            self.invalid.push((name.to_string(), raw));
            T::default()
        })
    }
}
