//! Forwarding of tracked events to the analytics API.
//!
//! ```text
//! inbound payload → build_event() → AnalyticsEvent → Forwarder::forward() → POST /events.track
//! ```

pub mod client;
pub mod error;
pub mod event;

pub use client::{Forwarder, TRACK_PATH};
pub use error::ForwardError;
pub use event::{build_event, build_properties, resolve_email, AnalyticsEvent, EmailSource};
