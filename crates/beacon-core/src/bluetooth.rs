//! Scan backends.
//!
//! - [`bluez`] drives a real adapter through BlueZ (`bluetooth` feature, Linux only).
//! - [`mock`] is an in-memory backend for tests and for running without a radio
//!   (`mock-bluetooth` feature, or whenever the BlueZ backend is not compiled).

#[cfg(feature = "bluetooth")]
pub mod bluez;

#[cfg(any(test, feature = "mock-bluetooth", not(feature = "bluetooth")))]
pub mod mock;

#[cfg(feature = "bluetooth")]
pub use bluez::{open_adapter, BluezRadio, BluezScanSource};

#[cfg(any(test, feature = "mock-bluetooth", not(feature = "bluetooth")))]
pub use mock::{demo_beacons, MockRadio, MockScanSource};
