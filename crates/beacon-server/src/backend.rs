//! Scan backend selection.
//!
//! With the `bluetooth` feature the server drives a BlueZ adapter. Without it,
//! an in-memory source replays a fixed set of advertisements so the API can be
//! exercised on machines without a radio.

use std::sync::Arc;

use beacon_core::{BluetoothConfig, RadioController, ScanEventSource};
use tokio::task::JoinHandle;

/// The scan source and radio a session is built from.
pub struct Backend {
    /// Backend name reported by the health endpoint.
    pub name: &'static str,

    /// Where scan events come from.
    pub source: Arc<dyn ScanEventSource>,

    /// Radio power state.
    pub radio: Arc<dyn RadioController>,

    simulator: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("name", &self.name)
            .field("simulated", &self.simulator.is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for Backend {
    fn drop(&mut self) {
        if let Some(simulator) = self.simulator.take() {
            simulator.abort();
        }
    }
}

/// Open the BlueZ backend on the configured adapter.
///
/// # Errors
///
/// Returns an error if BlueZ is unreachable or the adapter does not exist.
#[cfg(feature = "bluetooth")]
pub async fn open(config: &BluetoothConfig) -> anyhow::Result<Backend> {
    use beacon_core::bluetooth::{open_adapter, BluezRadio, BluezScanSource};
    use tracing::info;

    let adapter = open_adapter(config.adapter.as_deref()).await?;
    let radio = BluezRadio::new(&adapter).await?;
    info!(adapter = %adapter.name(), powered = radio.is_enabled(), "using BlueZ backend");

    Ok(Backend {
        name: "bluez",
        source: Arc::new(BluezScanSource::new(adapter)),
        radio: Arc::new(radio),
        simulator: None,
    })
}

/// Open the simulated backend.
///
/// # Errors
///
/// Never fails; the signature matches the BlueZ variant.
#[cfg(not(feature = "bluetooth"))]
#[allow(clippy::unused_async)]
pub async fn open(config: &BluetoothConfig) -> anyhow::Result<Backend> {
    use beacon_core::bluetooth::{MockRadio, MockScanSource};
    use tracing::info;

    if let Some(adapter) = &config.adapter {
        info!(%adapter, "adapter setting ignored by simulated backend");
    }
    info!("using simulated backend");

    let source = Arc::new(MockScanSource::new());
    let simulator = simulate::spawn(Arc::clone(&source), simulate::DEFAULT_INTERVAL);

    Ok(Backend {
        name: "mock",
        source,
        radio: Arc::new(MockRadio::new(true)),
        simulator: Some(simulator),
    })
}

#[cfg(not(feature = "bluetooth"))]
mod simulate {
    use std::sync::Arc;
    use std::time::Duration;

    use beacon_core::bluetooth::{demo_beacons, MockScanSource};
    use tokio::task::JoinHandle;
    use tracing::trace;

    /// Time between replayed advertisements.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

    /// Replay the demo advertisements into `source` forever.
    ///
    /// Events are only delivered while a subscription is open.
    pub fn spawn(source: Arc<MockScanSource>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            let mut events = demo_beacons().into_iter().cycle();
            loop {
                ticker.tick().await;
                let Some(event) = events.next() else {
                    break;
                };
                if source.emit(event) {
                    trace!("replayed simulated advertisement");
                }
            }
        })
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use beacon_core::bluetooth::MockRadio;
        use beacon_core::DiscoverySession;

        #[tokio::test]
        async fn test_simulator_feeds_open_subscription() {
            let source = Arc::new(MockScanSource::new());
            let session = DiscoverySession::new(source.clone(), Arc::new(MockRadio::new(true)));
            session.start_discovery();

            let handle = spawn(source, Duration::from_millis(5));
            tokio::time::sleep(Duration::from_millis(250)).await;
            handle.abort();

            assert_eq!(session.snapshot().len(), 5);
        }
    }
}
