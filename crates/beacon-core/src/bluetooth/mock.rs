//! In-memory scan backend for tests and development without a radio.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::scan::{
    CallbackKind, RadioController, RawScanResult, ScanEvent, ScanEventSource, ScanFailure,
};
use crate::session::ScanCallback;

/// Radio whose state is set by hand.
#[derive(Debug)]
pub struct MockRadio {
    enabled: AtomicBool,
}

impl MockRadio {
    /// Create a radio that starts `enabled` or disabled.
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }

    /// Power the radio on or off.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}

impl Default for MockRadio {
    fn default() -> Self {
        Self::new(true)
    }
}

impl RadioController for MockRadio {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

/// Scan source that records subscriptions and lets the caller inject events.
#[derive(Debug, Default)]
pub struct MockScanSource {
    callback: Mutex<Option<ScanCallback>>,
    fail_on_start: Mutex<Option<ScanFailure>>,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl MockScanSource {
    /// Create an idle source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<ScanCallback>> {
        self.callback.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next `start` report `failure` before returning.
    pub fn fail_on_start(&self, failure: Option<ScanFailure>) {
        *self
            .fail_on_start
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = failure;
    }

    /// The callback of the open subscription.
    #[must_use]
    pub fn callback(&self) -> Option<ScanCallback> {
        self.slot().clone()
    }

    /// `true` between `start` and `stop`.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.slot().is_some()
    }

    /// How many times `start` was called.
    #[must_use]
    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    /// How many times `stop` was called.
    #[must_use]
    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    /// Deliver `event` to the open subscription.
    ///
    /// Returns `false` when nobody is subscribed.
    pub fn emit(&self, event: ScanEvent) -> bool {
        // Clone out so the session can call back into the source.
        let Some(callback) = self.callback() else {
            return false;
        };
        callback.deliver(event);
        true
    }

    /// Report a scan failure and drop the subscription.
    pub fn fail(&self, failure: ScanFailure) -> bool {
        let Some(callback) = self.slot().take() else {
            return false;
        };
        callback.on_scan_failed(failure);
        true
    }
}

impl ScanEventSource for MockScanSource {
    fn start(&self, callback: ScanCallback) {
        self.starts.fetch_add(1, Ordering::SeqCst);
        let failure = self
            .fail_on_start
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match failure {
            Some(failure) => callback.on_scan_failed(failure),
            None => *self.slot() = Some(callback),
        }
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.slot().take();
    }
}

/// A handful of advertisements resembling a typical room.
#[must_use]
pub fn demo_beacons() -> Vec<ScanEvent> {
    vec![
        ScanEvent::Result {
            kind: CallbackKind::FirstMatch,
            result: RawScanResult::new("C4:7C:8D:6A:12:01").with_device_name("Tile Mate"),
        },
        ScanEvent::Result {
            kind: CallbackKind::AllMatches,
            result: RawScanResult::new("F0:99:B6:21:7E:44").with_payload_name("Kontakt Beacon"),
        },
        ScanEvent::Batch(vec![
            RawScanResult::new("D2:3A:11:9F:00:7B"),
            RawScanResult::new("E8:6B:EA:42:93:C0").with_device_name("Mi Band 6"),
            RawScanResult::new("C4:7C:8D:6A:12:01").with_device_name("Tile Mate"),
        ]),
        ScanEvent::Result {
            kind: CallbackKind::MatchLost,
            result: RawScanResult::new("F0:99:B6:21:7E:44"),
        },
        ScanEvent::Result {
            kind: CallbackKind::AllMatches,
            result: RawScanResult::new("5A:0B:77:C1:E2:3D").with_payload_name("AirTag"),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::DiscoverySession;
    use std::sync::Arc;

    #[test]
    fn test_emit_without_subscription_is_noop() {
        let source = MockScanSource::new();
        assert!(!source.emit(ScanEvent::Batch(vec![])));
        assert!(!source.fail(ScanFailure::Internal));
    }

    #[test]
    fn test_demo_beacons_collapse_duplicates() {
        let source = Arc::new(MockScanSource::new());
        let session = DiscoverySession::new(source.clone(), Arc::new(MockRadio::default()));
        session.start_discovery();

        for event in demo_beacons() {
            source.emit(event);
        }

        assert_eq!(session.snapshot().len(), 5);
    }
}
