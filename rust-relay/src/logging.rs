//! Structured JSON logging setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Verbosity;

/// Filter for the given verbosity; `RUST_LOG` takes precedence when set.
pub fn env_filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()))
}

/// Install the global JSON subscriber.
pub fn init(verbosity: Verbosity) {
    tracing_subscriber::registry()
        .with(env_filter(verbosity))
        .with(fmt::layer().json().flatten_event(true))
        .init();
}
