//! Scan event types and the collaborator traits a discovery session depends on.
//!
//! A [`ScanEventSource`] wraps the platform's radio-scanning facility and a
//! [`RadioController`] reports whether the radio can be used at all. Both are
//! injected into a [`DiscoverySession`](crate::DiscoverySession), so the session can
//! be driven by BlueZ in production and by the in-memory mock backend in tests.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::session::ScanCallback;

/// Why a single scan result was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CallbackKind {
    /// A matching advertisement was seen.
    AllMatches,
    /// The first advertisement from a device that matches the filter.
    FirstMatch,
    /// A previously matched device is no longer heard.
    MatchLost,
}

/// An advertisement as reported by the scanning facility, before mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RawScanResult {
    /// Name reported by the device's cached metadata.
    pub device_name: Option<String>,

    /// Name carried in the advertisement payload.
    pub payload_name: Option<String>,

    /// Hardware address of the advertiser.
    #[schema(example = "AA:BB:CC:DD:EE:FF")]
    pub hardware_address: Option<String>,
}

impl RawScanResult {
    /// Create a result for `address` with no names attached.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            hardware_address: Some(address.into()),
            ..Self::default()
        }
    }

    /// Attach a device-reported name.
    #[must_use]
    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = Some(name.into());
        self
    }

    /// Attach an advertisement-payload name.
    #[must_use]
    pub fn with_payload_name(mut self, name: impl Into<String>) -> Self {
        self.payload_name = Some(name.into());
        self
    }
}

/// Failure reported by a scan event source.
///
/// The numbered reasons follow the platform scanner's error codes.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize, ToSchema)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ScanFailure {
    /// A scan with the same settings is already running.
    #[error("scan already started")]
    AlreadyStarted,

    /// The scanner could not register the application.
    #[error("application registration failed")]
    RegistrationFailed,

    /// Internal error in the radio stack.
    #[error("internal radio error")]
    Internal,

    /// The requested scan feature is not supported by the hardware.
    #[error("scan feature unsupported")]
    FeatureUnsupported,

    /// The radio ran out of hardware resources.
    #[error("out of hardware resources")]
    OutOfHardwareResources,

    /// Scans were started too often in a short window.
    #[error("scanning too frequently")]
    ScanningTooFrequently,

    /// Error raised by the host Bluetooth daemon.
    #[error("backend error: {message}")]
    Backend {
        /// Message from the backend.
        message: String,
    },

    /// A code this crate does not know.
    #[error("unknown scan failure code {code}")]
    Unknown {
        /// The raw code.
        code: i32,
    },
}

impl ScanFailure {
    /// Map a numeric scanner error code to a failure reason.
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            1 => Self::AlreadyStarted,
            2 => Self::RegistrationFailed,
            3 => Self::Internal,
            4 => Self::FeatureUnsupported,
            5 => Self::OutOfHardwareResources,
            6 => Self::ScanningTooFrequently,
            code => Self::Unknown { code },
        }
    }

    /// The numeric code for this failure, when it has one.
    #[must_use]
    pub const fn code(&self) -> Option<i32> {
        match self {
            Self::AlreadyStarted => Some(1),
            Self::RegistrationFailed => Some(2),
            Self::Internal => Some(3),
            Self::FeatureUnsupported => Some(4),
            Self::OutOfHardwareResources => Some(5),
            Self::ScanningTooFrequently => Some(6),
            Self::Unknown { code } => Some(*code),
            Self::Backend { .. } => None,
        }
    }
}

/// One inbound notification from a scan event source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// A single result.
    Result {
        /// Why it was delivered.
        kind: CallbackKind,
        /// The advertisement.
        result: RawScanResult,
    },
    /// Results the scanner accumulated and delivered together.
    Batch(Vec<RawScanResult>),
    /// The scanner stopped because of an error.
    Failed(ScanFailure),
}

/// The radio-scanning facility.
///
/// Both calls are fire-and-forget requests; failures are reported later through
/// [`ScanCallback::on_scan_failed`], never as return values.
pub trait ScanEventSource: Send + Sync {
    /// Begin delivering scan events to `callback`.
    fn start(&self, callback: ScanCallback);

    /// Stop delivering events to the last callback passed to [`start`](Self::start).
    fn stop(&self);
}

/// Reports whether the radio can currently be used.
///
/// Enabling the radio is left to the caller; a session only asks.
pub trait RadioController: Send + Sync {
    /// `true` when the radio is powered and usable.
    fn is_enabled(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_codes_round_trip() {
        for code in 1..=6 {
            assert_eq!(ScanFailure::from_code(code).code(), Some(code));
        }
        assert_eq!(
            ScanFailure::from_code(99),
            ScanFailure::Unknown { code: 99 }
        );
        assert_eq!(
            ScanFailure::Backend {
                message: "busy".into()
            }
            .code(),
            None
        );
    }

    #[test]
    fn test_failure_serialization_is_tagged() {
        let json = serde_json::to_string(&ScanFailure::OutOfHardwareResources).unwrap();
        assert_eq!(json, r#"{"reason":"out_of_hardware_resources"}"#);
    }

    #[test]
    fn test_raw_result_builder() {
        let raw = RawScanResult::new("AA:BB")
            .with_device_name("Foo")
            .with_payload_name("Bar");
        assert_eq!(raw.hardware_address.as_deref(), Some("AA:BB"));
        assert_eq!(raw.device_name.as_deref(), Some("Foo"));
        assert_eq!(raw.payload_name.as_deref(), Some("Bar"));
    }
}
