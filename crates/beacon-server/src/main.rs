//! # beacon-server
//!
//! HTTP server for the beacon nearby-device scanner.
//!
//! This binary provides:
//! - REST API for driving discovery and reading the device list
//! - Server-Sent Events stream of discovery events
//! - OpenAPI document at `/api/openapi.json`
//! - Structured logging to file and stdout
//!
//! ## Running
//!
//! ```bash
//! # Development (simulated advertisements)
//! cargo run --package beacon-server
//!
//! # With a real adapter
//! cargo run --package beacon-server --features bluetooth
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use anyhow::Context;
use beacon_core::{default_config_path, Config, DiscoveryEvent, DiscoverySession};
use beacon_server::state::AppState;
use beacon_server::{api, backend, logging};
use tokio::net::TcpListener;
use tokio::sync::broadcast::{error::RecvError, Receiver};
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = default_config_path();
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    logging::init(&config.logging)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "Starting beacon-server"
    );

    let backend = backend::open(&config.bluetooth).await?;
    let session = DiscoverySession::with_event_capacity(
        backend.source.clone(),
        backend.radio.clone(),
        config.discovery.event_capacity,
    );
    let event_log = tokio::spawn(log_events(session.subscribe()));

    let state = AppState::new(config, session, backend.name).shared();

    if state.config.discovery.auto_start {
        let outcome = state.session.start_discovery();
        info!(?outcome, "auto-start requested");
    }

    let app = api::create_router(state.clone());

    let server = &state.config.server;
    let listener = TcpListener::bind((server.host.as_str(), server.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", server.host, server.port))?;

    info!(address = %listener.local_addr()?, backend = backend.name, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.session.stop_discovery();
    event_log.abort();
    info!("beacon-server stopped");

    Ok(())
}

/// Log every discovery event until the session goes away.
async fn log_events(mut events: Receiver<DiscoveryEvent>) {
    loop {
        match events.recv().await {
            Ok(DiscoveryEvent::Started { scan_id }) => info!(%scan_id, "discovery started"),
            Ok(DiscoveryEvent::Stopped { cause: Some(cause) }) => {
                warn!(%cause, "discovery stopped by scan failure");
            }
            Ok(DiscoveryEvent::Stopped { cause: None }) => debug!("discovery stopped"),
            Ok(DiscoveryEvent::RadioUnavailable) => warn!("radio unavailable"),
            Ok(DiscoveryEvent::Updated { devices }) => {
                debug!(count = devices.len(), "device list updated");
            }
            Err(RecvError::Lagged(skipped)) => debug!(skipped, "event log lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
