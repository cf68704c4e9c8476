//! # beacon-core
//!
//! Core discovery logic for the beacon nearby-device scanner.
//!
//! This crate provides:
//! - A discovery session that drives a radio scanner and publishes lifecycle events
//! - A deduplicating registry of discovered devices
//! - Mapping rules from raw advertisements to device records
//! - BlueZ and in-memory scan backends
//! - Configuration management
//!
//! ## Architecture
//!
//! - [`device`] - Device records and name resolution
//! - [`registry`] - Deduplicating device set keyed by hardware address
//! - [`scan`] - Scan events and the source/radio collaborator traits
//! - [`session`] - The discovery state machine and its event channel
//! - [`bluetooth`] - Scan backends (BlueZ, mock)
//! - [`config`] - Application configuration loading, saving, and validation
//! - [`error`] - Unified error types for the crate
//! - [`types`] - Shared types and OpenAPI schemas
//!
//! ## Example
//!
//! ```rust
//! # #[cfg(not(feature = "bluetooth"))]
//! # {
//! use std::sync::Arc;
//! use beacon_core::bluetooth::{MockRadio, MockScanSource};
//! use beacon_core::{CallbackKind, DiscoverySession, RawScanResult, ScanEvent, SessionState};
//!
//! let source = Arc::new(MockScanSource::new());
//! let session = DiscoverySession::new(source.clone(), Arc::new(MockRadio::new(true)));
//!
//! assert_eq!(session.start_discovery(), SessionState::Scanning);
//! source.emit(ScanEvent::Result {
//!     kind: CallbackKind::AllMatches,
//!     result: RawScanResult::new("AA:BB").with_device_name("Foo"),
//! });
//! assert_eq!(session.snapshot()[0].display_name(), "Foo");
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod bluetooth;
pub mod config;
pub mod device;
pub mod error;
pub mod registry;
pub mod scan;
pub mod session;
pub mod types;

// Re-export primary types for convenience
pub use crate::config::{
    default_config_path, is_valid_adapter_name, BluetoothConfig, Config, ConfigError,
    ConfigResult, DiscoveryConfig, LoggingConfig, ServerConfig,
};
pub use device::{display_name_for, DeviceRecord, HardwareAddress, UNKNOWN_DEVICE_NAME};
pub use error::{BeaconError, Result};
pub use registry::DiscoveryRegistry;
pub use scan::{
    CallbackKind, RadioController, RawScanResult, ScanEvent, ScanEventSource, ScanFailure,
};
pub use session::{
    DiscoveryEvent, DiscoverySession, SavedSession, ScanCallback, SessionState,
    DEFAULT_EVENT_CAPACITY,
};
pub use types::HealthResponse;
