//! Unified error types for the beacon core library.
//!
//! This module provides a unified error type [`BeaconError`] that covers all failure
//! modes across the beacon system. The configuration module keeps its own specific
//! error type ([`ConfigError`](crate::config::ConfigError)) for internal use, and
//! scan sources report [`ScanFailure`] values.
//!
//! Discovery sessions never return these errors to their callers. Radio and scan
//! failures become state transitions plus a [`DiscoveryEvent`](crate::DiscoveryEvent);
//! the error values exist so that backends, configuration loading and the HTTP layer
//! can classify and report them consistently.
//!
//! # Example
//!
//! ```rust
//! use beacon_core::error::{BeaconError, Result};
//! use std::path::PathBuf;
//!
//! fn load_config(path: &PathBuf) -> Result<()> {
//!     if !path.exists() {
//!         return Err(BeaconError::ConfigNotFound(path.clone()));
//!     }
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

use crate::scan::ScanFailure;

/// The unified error type for all beacon operations.
#[derive(Debug, Error)]
pub enum BeaconError {
    // =========================================================================
    // BLUETOOTH ERRORS
    // =========================================================================
    /// No Bluetooth adapter was found on this system.
    ///
    /// Carries the adapter that was requested, or `"default"`.
    #[error("No Bluetooth adapter found ('{0}'). Ensure Bluetooth hardware is present and drivers are loaded.")]
    AdapterNotFound(String),

    /// The radio exists but is disabled.
    #[error("Bluetooth radio is disabled. Run 'bluetoothctl power on' and retry discovery.")]
    RadioUnavailable,

    /// The scan event source reported a failure.
    #[error("Bluetooth scan failed: {0}")]
    ScanFailed(#[from] ScanFailure),

    /// A scan result could not be mapped to a device record.
    #[error("Malformed scan event: {0}")]
    MalformedEvent(String),

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// The configuration file was not found at the expected path.
    #[error("Configuration file not found at: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration file exists but could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// The configuration was parsed but contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // =========================================================================
    // I/O ERRORS
    // =========================================================================
    /// A low-level I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A specialized [`Result`] type for beacon operations.
pub type Result<T> = std::result::Result<T, BeaconError>;

impl BeaconError {
    /// Returns `true` if this error is related to the radio or scanning.
    #[inline]
    #[must_use]
    pub const fn is_bluetooth_error(&self) -> bool {
        matches!(
            self,
            Self::AdapterNotFound(_)
                | Self::RadioUnavailable
                | Self::ScanFailed(_)
                | Self::MalformedEvent(_)
        )
    }

    /// Returns `true` if this error is related to configuration.
    #[inline]
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound(_) | Self::ConfigParseError(_) | Self::ConfigValidationError(_)
        )
    }

    /// Returns `true` if discovery can be retried once the cause is fixed out-of-band.
    ///
    /// A disabled radio and scan failures both leave the session `Idle`; the caller
    /// may start or resume discovery again.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::RadioUnavailable | Self::ScanFailed(_) | Self::MalformedEvent(_)
        )
    }

    /// Returns a machine-readable error code for API responses.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::AdapterNotFound(_) => "BLUETOOTH_ADAPTER_NOT_FOUND",
            Self::RadioUnavailable => "RADIO_UNAVAILABLE",
            Self::ScanFailed(_) => "SCAN_FAILED",
            Self::MalformedEvent(_) => "MALFORMED_EVENT",
            Self::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            Self::ConfigParseError(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidationError(_) => "CONFIG_VALIDATION_ERROR",
            Self::IoError(_) => "IO_ERROR",
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<crate::config::ConfigError> for BeaconError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        match err {
            ConfigError::NotFound(path) => Self::ConfigNotFound(path),
            ConfigError::Load(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::WriteError { path, source } => Self::IoError(std::io::Error::new(
                source.kind(),
                format!("Failed to write {}: {}", path.display(), source),
            )),
            ConfigError::SerializeError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::ValidationError { field, message } => {
                Self::ConfigValidationError(format!("{field}: {message}"))
            }
            ConfigError::MultipleValidationErrors(errors) => {
                let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
                Self::ConfigValidationError(messages.join("; "))
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoErr, ErrorKind};

    #[test]
    fn test_bluetooth_error_classification() {
        assert!(BeaconError::AdapterNotFound("default".into()).is_bluetooth_error());
        assert!(BeaconError::RadioUnavailable.is_bluetooth_error());
        assert!(BeaconError::ScanFailed(ScanFailure::Internal).is_bluetooth_error());
        assert!(BeaconError::MalformedEvent("no address".into()).is_bluetooth_error());

        assert!(!BeaconError::ConfigParseError("x".into()).is_bluetooth_error());
    }

    #[test]
    fn test_config_error_classification() {
        assert!(BeaconError::ConfigNotFound(PathBuf::from("/test")).is_config_error());
        assert!(BeaconError::ConfigParseError("syntax error".into()).is_config_error());
        assert!(BeaconError::ConfigValidationError("invalid value".into()).is_config_error());

        assert!(!BeaconError::RadioUnavailable.is_config_error());
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(BeaconError::RadioUnavailable.is_recoverable());
        assert!(BeaconError::ScanFailed(ScanFailure::OutOfHardwareResources).is_recoverable());
        assert!(!BeaconError::AdapterNotFound("default".into()).is_recoverable());
        assert!(!BeaconError::IoError(IoErr::new(ErrorKind::Other, "x")).is_recoverable());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            BeaconError::AdapterNotFound("default".into()).error_code(),
            "BLUETOOTH_ADAPTER_NOT_FOUND"
        );
        assert_eq!(BeaconError::RadioUnavailable.error_code(), "RADIO_UNAVAILABLE");
        assert_eq!(
            BeaconError::ConfigNotFound(PathBuf::new()).error_code(),
            "CONFIG_NOT_FOUND"
        );
    }

    #[test]
    fn test_from_scan_failure() {
        let err: BeaconError = ScanFailure::ScanningTooFrequently.into();
        assert!(matches!(
            err,
            BeaconError::ScanFailed(ScanFailure::ScanningTooFrequently)
        ));
    }

    #[test]
    fn test_error_display_messages() {
        let err = BeaconError::AdapterNotFound("default".into());
        assert!(err.to_string().contains("No Bluetooth adapter found"));

        let err = BeaconError::AdapterNotFound("hci3".into());
        assert!(err.to_string().contains("'hci3'"));

        let err = BeaconError::ScanFailed(ScanFailure::Unknown { code: 42 });
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<BeaconError>();
        assert_sync::<BeaconError>();
    }
}
