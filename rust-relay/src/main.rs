//! Coder Relay web server.
//!
//! Receives Coder notification webhooks, drops events outside the
//! `EVENTS_TRACKED` allow-list, and forwards the rest to the analytics API.

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::info;

use coder_relay::{logging, router, AppState, Config, Forwarder};

#[tokio::main]
async fn main() -> Result<()> {
    // Configuration decides the log level, so load it before logging starts
    let config = Config::from_env().context("Failed to load configuration")?;

    logging::init(config.verbosity);

    info!("relay_starting");
    config.log_summary();

    let forwarder = Forwarder::new(&config).context("Failed to build analytics client")?;
    info!(endpoint = %forwarder.endpoint(), "analytics_client_created");

    let addr = config.bind_addr();
    let app = router(AppState::new(config, forwarder));

    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "relay_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("relay_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("relay_shutting_down");
}
