// scanplug Source Code File
//
// Copyright 2020 Nonpolynomial Labs LLC. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! scanplug gates Bluetooth device discovery behind the environmental preconditions a mobile host
//! imposes (runtime permission grants, radio power, location service) and turns the host's raw
//! discovery notifications into a normalized stream of [`DeviceRecord`](api::DeviceRecord)s.
//!
//! The host platform is abstracted by the [`api::Platform`] trait. The host feeds its callbacks
//! (permission dialog results, enable-radio results, discovery broadcasts) back in as
//! [`api::PlatformEvent`]s, and consumers drive scans through the [`api::Scanner`] trait.
//!
//! ```no_run
//! use futures::stream::StreamExt;
//! use scanplug::api::{Platform, ScanOptions, Scanner};
//! use scanplug::orchestrator::Orchestrator;
//!
//! # async fn run(platform: impl Platform) -> scanplug::Result<()> {
//! let scanner = Orchestrator::new(platform);
//! let mut events = scanner.events().await?;
//!
//! let bonded = scanner.start_scan(ScanOptions { include_bonded: true }).await?;
//! println!("bonded: {:?}", bonded);
//!
//! while let Some(event) = events.next().await {
//!     println!("{:?}", event);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
#[cfg(feature = "serde")]
pub mod channel;
mod common;
pub mod orchestrator;
mod platform;

use std::result;

use api::Capabilities;

/// The main error type returned by most methods in scanplug.
///
/// Every variant maps to a stable string code (see [`Error::code`]) that is handed to consumers
/// alongside the human readable message.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Bluetooth adapter is null, BT is not supported on this device")]
    NoAdapter,

    #[error("Permissions were refused: {0:?}")]
    PermissionDenied(Capabilities),

    #[error("Permission request was cancelled")]
    PermissionRequestCancelled,

    #[error("Bluetooth need to be turned on to scan BT devices")]
    RadioDisabled,

    #[error("Gps need to be turned on to scan BT devices")]
    LocationDisabled,

    #[error("Discovery notifications are not subscribed")]
    NotSubscribed,

    #[error("Request was superseded by a newer gated request")]
    Superseded,

    #[error("The orchestrator has shut down")]
    Shutdown,

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}

impl Error {
    /// The wire code reported to consumers for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NoAdapter => "error_no_bt",
            Error::PermissionDenied(_) => "error_permission_denied",
            Error::PermissionRequestCancelled => "error_permission_cancelled",
            Error::RadioDisabled => "error_bt_disabled",
            Error::LocationDisabled => "error_no_gps",
            Error::NotSubscribed => "error_not_subscribed",
            Error::Superseded => "error_superseded",
            Error::Shutdown => "error_shutdown",
            Error::InvalidArguments(_) => "error_invalid_arguments",
        }
    }
}

/// Convenience type for a result using the scanplug [`Error`] type.
pub type Result<T> = result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_error_carries_gps_code() {
        let err = Error::LocationDisabled;
        assert_eq!(err.code(), "error_no_gps");
        assert_eq!(
            err.to_string(),
            "Gps need to be turned on to scan BT devices"
        );
    }

    #[test]
    fn denied_permissions_are_named() {
        let err = Error::PermissionDenied(Capabilities::RADIO_SCAN);
        assert_eq!(err.code(), "error_permission_denied");
        assert!(err.to_string().contains("RADIO_SCAN"));
    }
}
