// scanplug Source Code File
//
// Copyright 2020 Nonpolynomial Labs LLC. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! The `api` module contains the traits and types which make up scanplug's API. The host
//! implements [`Platform`]; consumers talk to a [`Scanner`].

mod capability;
mod device;
mod platform;

pub use capability::{required_capabilities, Capabilities, PlatformVersion};
pub use device::{normalize, DeviceRecord, DeviceType, RawDevice, LE_MARKER, UNNAMED_DEVICE};
pub use platform::{DiscoveryEvent, GateEvent, Platform, PlatformEvent, Subscription};

use crate::Result;
use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;

/// Options for a scan. Passed to [`Scanner::start_scan`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Return the host's bonded devices as the result of the start call.
    pub include_bonded: bool,
}

/// Events pushed to consumers. Uncorrelated with any request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumerEvent {
    /// A device was found during the active scan.
    NewDevice(DeviceRecord),
    /// The scan stopped, either because it was stopped explicitly or because the host ended it.
    ScanStopped,
}

/// Scanner is the consumer-facing side of scanplug. Every call that needs the radio is gated on
/// the host's preconditions, which may involve prompting the user before the call resolves.
#[async_trait]
pub trait Scanner: Send + Sync + Clone {
    /// Retrieve a stream of [`ConsumerEvent`]s. The stream receives every event emitted after the
    /// call, for any scan.
    async fn events(&self) -> Result<Pin<Box<dyn Stream<Item = ConsumerEvent> + Send>>>;

    /// Starts a scan, restarting it if one is already running. Devices found while scanning are
    /// announced on [`events`](Scanner::events). If [`ScanOptions::include_bonded`] is set the
    /// host's bonded devices are returned, otherwise the returned list is empty.
    async fn start_scan(&self, options: ScanOptions) -> Result<Vec<DeviceRecord>>;

    /// Stops scanning. Always succeeds, even if no scan is running.
    async fn stop_scan(&self) -> Result<()>;

    /// Walks through the precondition gates without scanning.
    async fn request_permissions(&self) -> Result<()>;
}
