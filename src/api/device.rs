//! Device descriptors as reported by the host, and the normalized records handed to consumers.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "serde")]
use serde_cr as serde;

/// Name reported for devices that do not advertise one.
pub const UNNAMED_DEVICE: &str = "No name";

/// Suffix marking a device as Bluetooth Low Energy only.
pub const LE_MARKER: &str = "-LE";

/// Radio technology the host reports for a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceType {
    /// The host could not (or did not) determine the device type.
    #[default]
    Unknown,
    Classic,
    Le,
    Dual,
}

/// A device descriptor as delivered by the host's radio stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDevice {
    pub name: Option<String>,
    /// Hardware address, unique per physical device.
    pub address: String,
    pub device_type: DeviceType,
}

impl RawDevice {
    pub fn new(name: Option<&str>, address: &str, device_type: DeviceType) -> Self {
        Self {
            name: name.map(str::to_owned),
            address: address.to_owned(),
            device_type,
        }
    }
}

/// The canonical `{name, address}` record reported to consumers.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_cr")
)]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceRecord {
    pub name: String,
    pub address: String,
}

impl From<&RawDevice> for DeviceRecord {
    fn from(raw: &RawDevice) -> Self {
        normalize(raw)
    }
}

/// Converts a raw host descriptor into a [`DeviceRecord`].
///
/// A missing name becomes [`UNNAMED_DEVICE`]. Low energy devices get [`LE_MARKER`] appended
/// unless the name already carries it.
pub fn normalize(raw: &RawDevice) -> DeviceRecord {
    let mut name = raw
        .name
        .clone()
        .unwrap_or_else(|| UNNAMED_DEVICE.to_owned());
    if raw.device_type == DeviceType::Le && !name.contains(LE_MARKER) {
        name.push_str(LE_MARKER);
    }
    DeviceRecord {
        name,
        address: raw.address.clone(),
    }
}
