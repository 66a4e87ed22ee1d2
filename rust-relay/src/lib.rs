//! Coder Relay - forwards tracked Coder notification webhooks to an
//! analytics ingestion API.
//!
//! ## Architecture
//!
//! ```text
//! Coder webhook → POST / → allow-list filter → reshape → POST <api>/events.track
//! ```
//!
//! Each request is handled independently; the only shared state is the
//! configuration loaded at startup.

pub mod config;
pub mod forward;
pub mod logging;
pub mod payload;
pub mod relay;
pub mod util;
pub mod web;

// Re-export commonly used types
pub use config::{Config, ConfigError, PropertiesMode, TrackedEvents, Verbosity};
pub use forward::{AnalyticsEvent, ForwardError, Forwarder};
pub use payload::{PayloadSchema, SchemaVariant};
pub use relay::{Outcome, Relay, RelayError};
pub use util::normalize_event_name;
pub use web::{router, AppState};
