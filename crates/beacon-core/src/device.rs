//! Device records and the rules for deriving them from scan results.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{BeaconError, Result};
use crate::scan::RawScanResult;

/// Display name used when a device advertises no usable name.
pub const UNKNOWN_DEVICE_NAME: &str = "Unknown Device";

/// Unique radio identifier of a device. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "AA:BB:CC:DD:EE:FF")]
pub struct HardwareAddress(String);

impl HardwareAddress {
    /// Create an address, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`BeaconError::MalformedEvent`] if the address is blank.
    pub fn new(address: impl AsRef<str>) -> Result<Self> {
        let trimmed = address.as_ref().trim();
        if trimmed.is_empty() {
            return Err(BeaconError::MalformedEvent(
                "hardware address is empty".into(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HardwareAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for HardwareAddress {
    type Error = BeaconError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<HardwareAddress> for String {
    fn from(address: HardwareAddress) -> Self {
        address.0
    }
}

/// One observed device.
///
/// Two records describe the same device when their hardware addresses match,
/// whatever their names say.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(from = "StoredDeviceRecord")]
#[schema(example = json!({
    "hardware_address": "AA:BB:CC:DD:EE:FF",
    "advertised_name": "Tile",
    "display_name": "Tile"
}))]
pub struct DeviceRecord {
    hardware_address: HardwareAddress,
    advertised_name: Option<String>,
    /// Derived from the advertised name; ignored on input.
    #[schema(read_only)]
    display_name: String,
}

/// Serialized form of a record; the display name is derived again on load.
#[derive(Deserialize)]
struct StoredDeviceRecord {
    hardware_address: HardwareAddress,
    #[serde(default)]
    advertised_name: Option<String>,
}

impl From<StoredDeviceRecord> for DeviceRecord {
    fn from(stored: StoredDeviceRecord) -> Self {
        Self::new(stored.hardware_address, stored.advertised_name)
    }
}

impl DeviceRecord {
    /// Create a record, deriving its display name from `advertised_name`.
    #[must_use]
    pub fn new(hardware_address: HardwareAddress, advertised_name: Option<String>) -> Self {
        let display_name = display_name_for(advertised_name.as_deref()).to_string();
        Self {
            hardware_address,
            advertised_name,
            display_name,
        }
    }

    /// The dedup key.
    #[must_use]
    pub const fn hardware_address(&self) -> &HardwareAddress {
        &self.hardware_address
    }

    /// Name taken from device metadata or the advertisement, if any.
    #[must_use]
    pub fn advertised_name(&self) -> Option<&str> {
        self.advertised_name.as_deref()
    }

    /// Human-presentable name. Never empty.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// `true` when both records describe the same physical device.
    #[must_use]
    pub fn is_same_device(&self, other: &Self) -> bool {
        self.hardware_address == other.hardware_address
    }

    /// `true` when both records would render identically.
    #[must_use]
    pub fn has_same_content(&self, other: &Self) -> bool {
        self.display_name == other.display_name
    }
}

/// Resolve the name to show for a device.
#[must_use]
pub fn display_name_for(advertised_name: Option<&str>) -> &str {
    match advertised_name {
        Some(name) if !name.is_empty() => name,
        _ => UNKNOWN_DEVICE_NAME,
    }
}

impl TryFrom<RawScanResult> for DeviceRecord {
    type Error = BeaconError;

    /// Map a scan result to a record.
    ///
    /// The device-reported name wins over the payload name. A result without a
    /// hardware address cannot be keyed and is rejected.
    fn try_from(raw: RawScanResult) -> Result<Self> {
        let address = raw
            .hardware_address
            .ok_or_else(|| {
                BeaconError::MalformedEvent("scan result has no hardware address".into())
            })
            .and_then(HardwareAddress::new)?;
        let advertised_name = raw.device_name.or(raw.payload_name);
        Ok(Self::new(address, advertised_name))
    }
}
