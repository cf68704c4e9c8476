//! The discovery session state machine.
//!
//! A [`DiscoverySession`] owns a [`DiscoveryRegistry`], drives an injected
//! [`ScanEventSource`] and publishes [`DiscoveryEvent`]s on a broadcast channel.
//!
//! ```text
//!            start / resume (radio on)
//!   ┌──────┐ ───────────────────────────▶ ┌──────────┐
//!   │ Idle │                              │ Scanning │
//!   └──────┘ ◀─────────────────────────── └──────────┘
//!            stop / scan failure
//! ```
//!
//! Scan events reach the session through a [`ScanCallback`] bound to one
//! subscription. Each callback invocation is applied under a single lock and
//! produces at most one snapshot, so subscribers never observe a half-applied
//! batch. Callbacks from a subscription that has since been stopped or replaced
//! are dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::device::DeviceRecord;
use crate::registry::DiscoveryRegistry;
use crate::scan::{
    CallbackKind, RadioController, RawScanResult, ScanEvent, ScanEventSource, ScanFailure,
};

/// Default capacity of the event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Whether the session is currently receiving scan events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Not subscribed to the scan source.
    Idle,
    /// Subscribed and applying scan events.
    Scanning,
}

/// Notification published by a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiscoveryEvent {
    /// A subscription was opened.
    Started {
        /// Identifies the subscription.
        scan_id: Uuid,
    },
    /// The session went idle.
    Stopped {
        /// Set when the scan source failed; absent for explicit stops.
        cause: Option<ScanFailure>,
    },
    /// Discovery was requested while the radio is disabled.
    ///
    /// The session stays idle; enable the radio and retry.
    RadioUnavailable,
    /// The full current device list.
    Updated {
        /// Devices in first-seen order.
        devices: Vec<DeviceRecord>,
    },
}

/// What a presentation layer keeps across a suspend/resume boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SavedSession {
    /// Whether discovery was running when the state was saved.
    pub active: bool,

    /// Devices known when the state was saved.
    pub devices: Vec<DeviceRecord>,
}

struct Inner {
    registry: DiscoveryRegistry,
    scan_id: Option<Uuid>,
}

struct Shared {
    inner: Mutex<Inner>,
    events: broadcast::Sender<DiscoveryEvent>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: DiscoveryEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn emit_snapshot(&self, inner: &Inner) {
        self.emit(DiscoveryEvent::Updated {
            devices: inner.registry.snapshot(),
        });
    }
}

impl Inner {
    fn is_current(&self, scan_id: Uuid) -> bool {
        self.scan_id == Some(scan_id)
    }

    /// Map and insert one result. Returns `true` if the registry changed.
    fn ingest(&mut self, raw: RawScanResult) -> bool {
        match DeviceRecord::try_from(raw) {
            Ok(record) => {
                let address = record.hardware_address().clone();
                let added = self.registry.upsert(record);
                if added {
                    debug!(%address, "device discovered");
                }
                added
            }
            Err(e) => {
                debug!(error = %e, "discarding scan result");
                false
            }
        }
    }
}

/// Handle through which a [`ScanEventSource`] delivers events to a session.
///
/// Each handle belongs to one subscription. Once the session stops or starts a
/// new subscription, results delivered through an old handle are ignored.
#[derive(Clone)]
pub struct ScanCallback {
    shared: Arc<Shared>,
    scan_id: Uuid,
}

impl std::fmt::Debug for ScanCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanCallback")
            .field("scan_id", &self.scan_id)
            .finish_non_exhaustive()
    }
}

impl ScanCallback {
    /// The subscription this handle belongs to.
    #[must_use]
    pub const fn scan_id(&self) -> Uuid {
        self.scan_id
    }

    /// `true` while the session still listens to this subscription.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.shared.lock().is_current(self.scan_id)
    }

    /// Dispatch any scan event.
    pub fn deliver(&self, event: ScanEvent) {
        match event {
            ScanEvent::Result { kind, result } => self.on_scan_result(kind, result),
            ScanEvent::Batch(results) => self.on_batch_scan_results(results),
            ScanEvent::Failed(failure) => self.on_scan_failed(failure),
        }
    }

    /// Apply a single result.
    ///
    /// `MatchLost` results are ignored: devices are never removed once seen.
    pub fn on_scan_result(&self, kind: CallbackKind, result: RawScanResult) {
        if kind == CallbackKind::MatchLost {
            trace!(address = ?result.hardware_address, "ignoring lost match");
            return;
        }
        let mut inner = self.shared.lock();
        if !inner.is_current(self.scan_id) {
            trace!(scan_id = %self.scan_id, "dropping result from stale subscription");
            return;
        }
        if inner.ingest(result) {
            self.shared.emit_snapshot(&inner);
        }
    }

    /// Apply a batch of results and publish one snapshot for all of them.
    pub fn on_batch_scan_results(&self, results: Vec<RawScanResult>) {
        let mut inner = self.shared.lock();
        if !inner.is_current(self.scan_id) {
            trace!(scan_id = %self.scan_id, "dropping batch from stale subscription");
            return;
        }
        let received = results.len();
        let mut added = 0usize;
        for raw in results {
            if inner.ingest(raw) {
                added += 1;
            }
        }
        debug!(received, added, "applied scan batch");
        self.shared.emit_snapshot(&inner);
    }

    /// The source stopped scanning because of `failure`.
    ///
    /// The session goes idle and publishes `Stopped` whatever state it was in,
    /// unless a newer subscription has already replaced this one.
    pub fn on_scan_failed(&self, failure: ScanFailure) {
        let mut inner = self.shared.lock();
        if let Some(current) = inner.scan_id {
            if current != self.scan_id {
                debug!(
                    scan_id = %self.scan_id,
                    %failure,
                    "ignoring failure from stale subscription"
                );
                return;
            }
        }
        warn!(scan_id = %self.scan_id, %failure, "scan failed, discovery stopped");
        inner.scan_id = None;
        self.shared.emit(DiscoveryEvent::Stopped {
            cause: Some(failure),
        });
    }
}

/// Drives discovery for one presentation surface.
///
/// The session is idle until [`start_discovery`](Self::start_discovery) or
/// [`resume_discovery`](Self::resume_discovery) succeeds, and can be stopped and
/// restarted any number of times. Dropping it unsubscribes from the source.
pub struct DiscoverySession {
    source: Arc<dyn ScanEventSource>,
    radio: Arc<dyn RadioController>,
    shared: Arc<Shared>,
    control: Mutex<()>,
}

impl std::fmt::Debug for DiscoverySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoverySession")
            .field("state", &self.state())
            .field("devices", &self.shared.lock().registry.len())
            .finish_non_exhaustive()
    }
}

impl DiscoverySession {
    /// Create an idle session with the default event capacity.
    #[must_use]
    pub fn new(source: Arc<dyn ScanEventSource>, radio: Arc<dyn RadioController>) -> Self {
        Self::with_event_capacity(source, radio, DEFAULT_EVENT_CAPACITY)
    }

    /// Create an idle session whose event channel buffers `capacity` events per
    /// subscriber.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_event_capacity(
        source: Arc<dyn ScanEventSource>,
        radio: Arc<dyn RadioController>,
        capacity: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(capacity);
        Self {
            source,
            radio,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    registry: DiscoveryRegistry::new(),
                    scan_id: None,
                }),
                events,
            }),
            control: Mutex::new(()),
        }
    }

    /// Receive every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DiscoveryEvent> {
        self.shared.events.subscribe()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.shared.lock().scan_id.is_some() {
            SessionState::Scanning
        } else {
            SessionState::Idle
        }
    }

    /// `true` while scanning.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Scanning
    }

    /// Identifier of the open subscription, if any.
    #[must_use]
    pub fn scan_id(&self) -> Option<Uuid> {
        self.shared.lock().scan_id
    }

    /// Devices discovered so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<DeviceRecord> {
        self.shared.lock().registry.snapshot()
    }

    /// Start a fresh discovery, forgetting previously seen devices.
    ///
    /// Returns the state after the attempt: `Idle` if the radio is disabled or
    /// the source failed immediately.
    pub fn start_discovery(&self) -> SessionState {
        let _control = self.control();
        self.begin(true)
    }

    /// Start discovery keeping previously seen devices.
    pub fn resume_discovery(&self) -> SessionState {
        let _control = self.control();
        self.begin(false)
    }

    /// Stop discovery. Safe in any state; always publishes `Stopped`.
    pub fn stop_discovery(&self) {
        let _control = self.control();
        self.halt();
    }

    /// Feed previously saved devices back into the registry and publish the
    /// resulting snapshot.
    pub fn restore(&self, devices: Vec<DeviceRecord>) {
        let _control = self.control();
        let mut inner = self.shared.lock();
        let inserted = inner.registry.restore(devices);
        debug!(inserted, total = inner.registry.len(), "restored devices");
        self.shared.emit_snapshot(&inner);
    }

    /// Capture what is needed to rebuild this session later.
    #[must_use]
    pub fn save_state(&self) -> SavedSession {
        let inner = self.shared.lock();
        SavedSession {
            active: inner.scan_id.is_some(),
            devices: inner.registry.snapshot(),
        }
    }

    /// Rebuild from a saved state: restore devices, then resume discovery if it
    /// was running, otherwise stop it.
    pub fn restore_saved(&self, saved: SavedSession) -> SessionState {
        self.restore(saved.devices);
        if saved.active {
            self.resume_discovery()
        } else {
            self.stop_discovery();
            SessionState::Idle
        }
    }

    fn control(&self) -> MutexGuard<'_, ()> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, fresh: bool) -> SessionState {
        if self.shared.lock().scan_id.is_some() {
            debug!("discovery already running, restarting");
            self.halt();
        }

        let callback = {
            let mut inner = self.shared.lock();
            if fresh {
                inner.registry.clear();
            }

            if !self.radio.is_enabled() {
                warn!("radio unavailable, discovery not started");
                self.shared.emit(DiscoveryEvent::RadioUnavailable);
                return SessionState::Idle;
            }

            let scan_id = Uuid::now_v7();
            inner.scan_id = Some(scan_id);
            info!(%scan_id, fresh, known = inner.registry.len(), "discovery started");
            self.shared.emit(DiscoveryEvent::Started { scan_id });
            self.shared.emit_snapshot(&inner);

            ScanCallback {
                shared: Arc::clone(&self.shared),
                scan_id,
            }
        };

        // Outside the lock: a source may report a failure synchronously.
        self.source.start(callback);
        self.state()
    }

    fn halt(&self) {
        let previous = {
            let mut inner = self.shared.lock();
            let previous = inner.scan_id.take();
            self.shared.emit(DiscoveryEvent::Stopped { cause: None });
            previous
        };

        match previous {
            Some(scan_id) => {
                self.source.stop();
                info!(%scan_id, "discovery stopped");
            }
            None => debug!("stop requested while idle"),
        }
    }
}

impl Drop for DiscoverySession {
    fn drop(&mut self) {
        let previous = self.shared.lock().scan_id.take();
        if let Some(scan_id) = previous {
            self.source.stop();
            debug!(%scan_id, "session dropped, scan source released");
        }
    }
}
