//! Application state shared across handlers.

use std::sync::Arc;

use beacon_core::{Config, DiscoverySession};

/// Shared application state.
pub type SharedState = Arc<AppState>;

/// Everything a handler may need.
///
/// The discovery session synchronizes itself, so the state needs no outer lock.
#[derive(Debug)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Config,

    /// The discovery session rendered by this server.
    pub session: DiscoverySession,

    /// Name of the scan backend (`bluez` or `mock`).
    pub backend: &'static str,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(config: Config, session: DiscoverySession, backend: &'static str) -> Self {
        Self {
            config,
            session,
            backend,
        }
    }

    /// Wrap into the form handlers receive.
    #[must_use]
    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }
}
