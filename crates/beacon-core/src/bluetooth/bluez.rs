//! BlueZ scan backend (Linux, via `bluer`).
//!
//! The adapter's `Powered` property is mirrored into an atomic flag by a
//! background task, so [`RadioController::is_enabled`] can answer without
//! awaiting D-Bus. Each discovery subscription runs in its own task; aborting
//! the task drops the discovery stream, which tells BlueZ to stop scanning.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bluer::{Adapter, AdapterEvent, AdapterProperty, Address, Session};
use futures::{pin_mut, StreamExt};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{BeaconError, Result};
use crate::scan::{CallbackKind, RadioController, RawScanResult, ScanEventSource, ScanFailure};
use crate::session::ScanCallback;

fn backend_failure(err: &bluer::Error) -> ScanFailure {
    ScanFailure::Backend {
        message: err.to_string(),
    }
}

/// Open the named adapter, or the default one.
///
/// # Errors
///
/// Returns [`BeaconError::ScanFailed`] if the Bluetooth daemon cannot be reached
/// and [`BeaconError::AdapterNotFound`] if the adapter does not exist.
pub async fn open_adapter(name: Option<&str>) -> Result<Adapter> {
    let session = Session::new()
        .await
        .map_err(|e| BeaconError::ScanFailed(backend_failure(&e)))?;

    let adapter = match name {
        Some(name) => session.adapter(name),
        None => session.default_adapter().await,
    };

    adapter.map_err(|e| {
        debug!(error = %e, "adapter lookup failed");
        BeaconError::AdapterNotFound(name.unwrap_or("default").to_string())
    })
}

/// Radio state of a BlueZ adapter.
pub struct BluezRadio {
    adapter: String,
    powered: Arc<AtomicBool>,
    watcher: JoinHandle<()>,
}

impl BluezRadio {
    /// Read the current power state and follow later changes.
    ///
    /// # Errors
    ///
    /// Returns [`BeaconError::ScanFailed`] if the adapter properties cannot be read.
    pub async fn new(adapter: &Adapter) -> Result<Self> {
        let failure = |e: bluer::Error| BeaconError::ScanFailed(backend_failure(&e));

        let powered = Arc::new(AtomicBool::new(adapter.is_powered().await.map_err(failure)?));
        let events = adapter.events().await.map_err(failure)?;

        let name = adapter.name().to_string();
        let flag = Arc::clone(&powered);
        let watched = name.clone();
        let watcher = tokio::spawn(async move {
            pin_mut!(events);
            while let Some(event) = events.next().await {
                if let AdapterEvent::PropertyChanged(AdapterProperty::Powered(on)) = event {
                    info!(adapter = %watched, powered = on, "radio power changed");
                    flag.store(on, Ordering::SeqCst);
                }
            }
        });

        Ok(Self {
            adapter: name,
            powered,
            watcher,
        })
    }
}

impl RadioController for BluezRadio {
    fn is_enabled(&self) -> bool {
        self.powered.load(Ordering::SeqCst)
    }
}

impl Drop for BluezRadio {
    fn drop(&mut self) {
        debug!(adapter = %self.adapter, "releasing radio watcher");
        self.watcher.abort();
    }
}

/// Device discovery on a BlueZ adapter.
pub struct BluezScanSource {
    adapter: Adapter,
    runtime: Handle,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl BluezScanSource {
    /// Create a source for `adapter`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn new(adapter: Adapter) -> Self {
        Self {
            adapter,
            runtime: Handle::current(),
            task: Mutex::new(None),
        }
    }

    fn task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ScanEventSource for BluezScanSource {
    fn start(&self, callback: ScanCallback) {
        let adapter = self.adapter.clone();
        let handle = self.runtime.spawn(async move {
            let scan_id = callback.scan_id();
            match discover(&adapter, &callback).await {
                Ok(()) => {
                    warn!(%scan_id, "discovery stream ended");
                    callback.on_scan_failed(ScanFailure::Backend {
                        message: "discovery stream ended".into(),
                    });
                }
                Err(e) => callback.on_scan_failed(backend_failure(&e)),
            }
        });

        if let Some(previous) = self.task().replace(handle) {
            previous.abort();
        }
    }

    fn stop(&self) {
        if let Some(handle) = self.task().take() {
            handle.abort();
        }
    }
}

async fn discover(adapter: &Adapter, callback: &ScanCallback) -> bluer::Result<()> {
    let events = adapter.discover_devices().await?;
    pin_mut!(events);

    // Devices BlueZ already knows about arrive as one batch.
    let known = adapter.device_addresses().await?;
    let mut batch = Vec::with_capacity(known.len());
    for address in known {
        batch.push(read_result(adapter, address).await);
    }
    callback.on_batch_scan_results(batch);

    while let Some(event) = events.next().await {
        match event {
            AdapterEvent::DeviceAdded(address) => {
                let result = read_result(adapter, address).await;
                callback.on_scan_result(CallbackKind::AllMatches, result);
            }
            AdapterEvent::DeviceRemoved(address) => {
                callback.on_scan_result(
                    CallbackKind::MatchLost,
                    RawScanResult::new(address.to_string()),
                );
            }
            _ => {}
        }
    }
    Ok(())
}

/// BlueZ merges advertised and cached names into the device `Name` property,
/// so only the device name is filled.
async fn read_result(adapter: &Adapter, address: Address) -> RawScanResult {
    let name = match adapter.device(address) {
        Ok(device) => device.name().await.unwrap_or_else(|e| {
            debug!(%address, error = %e, "device name unavailable");
            None
        }),
        Err(e) => {
            debug!(%address, error = %e, "device vanished before it could be read");
            None
        }
    };

    RawScanResult {
        device_name: name,
        payload_name: None,
        hardware_address: Some(address.to_string()),
    }
}
