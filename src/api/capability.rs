//! Runtime capability grants the host requires before discovery may run.

use bitflags::bitflags;
use std::fmt::{self, Display, Formatter};

bitflags! {
    /// A set of runtime permissions, as granted (or requested) on the host platform.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        const LOCATION_FINE = 0x01;
        const RADIO = 0x02;
        const RADIO_ADMIN = 0x04;
        const RADIO_SCAN = 0x08;
        const RADIO_CONNECT = 0x10;
    }
}

impl Capabilities {
    /// Host permission identifiers for every capability in the set.
    pub fn permission_names(self) -> Vec<&'static str> {
        const NAMES: [(Capabilities, &str); 5] = [
            (
                Capabilities::LOCATION_FINE,
                "android.permission.ACCESS_FINE_LOCATION",
            ),
            (Capabilities::RADIO, "android.permission.BLUETOOTH"),
            (Capabilities::RADIO_ADMIN, "android.permission.BLUETOOTH_ADMIN"),
            (Capabilities::RADIO_SCAN, "android.permission.BLUETOOTH_SCAN"),
            (
                Capabilities::RADIO_CONNECT,
                "android.permission.BLUETOOTH_CONNECT",
            ),
        ];
        NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }
}

/// The host platform's API level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlatformVersion(pub u32);

impl PlatformVersion {
    /// First API level that splits the radio permission into scan and connect grants.
    pub const GRANULAR_RADIO_PERMISSIONS: PlatformVersion = PlatformVersion(31);
}

impl Display for PlatformVersion {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "API {}", self.0)
    }
}

/// Returns the capabilities that must all be granted before discovery on `version`.
///
/// Older hosts gate discovery on fine location plus the legacy radio permissions. From
/// [`PlatformVersion::GRANULAR_RADIO_PERMISSIONS`] on, location is dropped in favour of the
/// dedicated scan and connect grants.
pub fn required_capabilities(version: PlatformVersion) -> Capabilities {
    if version >= PlatformVersion::GRANULAR_RADIO_PERMISSIONS {
        Capabilities::RADIO
            | Capabilities::RADIO_ADMIN
            | Capabilities::RADIO_SCAN
            | Capabilities::RADIO_CONNECT
    } else {
        Capabilities::LOCATION_FINE | Capabilities::RADIO | Capabilities::RADIO_ADMIN
    }
}
