//! The seam between scanplug and the host platform.
//!
//! Everything the host does asynchronously (permission dialogs, enable-radio dialogs, location
//! toggles, discovery broadcasts) is requested through [`Platform`] and returns immediately. The
//! outcome comes back later as a [`PlatformEvent`] posted through
//! [`Orchestrator::notify`](crate::orchestrator::Orchestrator::notify).

use super::{Capabilities, PlatformVersion, RawDevice};
use crate::Result;

/// Handle identifying one registration for discovery notifications.
///
/// The host tags every [`DiscoveryEvent`] with the handle of the registration it was delivered
/// under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Subscription(pub u64);

/// Host services needed to gate and run discovery.
pub trait Platform: Send + 'static {
    /// API level of the running host. Queried on every gate evaluation.
    fn version(&self) -> PlatformVersion;

    /// Whether the host has a radio adapter at all.
    fn has_radio_adapter(&self) -> bool;

    /// Capabilities currently granted to the application. Grants can be revoked externally, so
    /// this is queried fresh on every gate evaluation.
    fn granted_capabilities(&self) -> Capabilities;

    fn is_radio_enabled(&self) -> bool;

    fn is_location_enabled(&self) -> bool;

    /// Shows the permission prompt for `capabilities`. Answered with
    /// [`GateEvent::CapabilityResult`].
    fn request_capabilities(&mut self, capabilities: Capabilities);

    /// Asks the user to power on the radio. Answered with [`GateEvent::RadioEnableResult`].
    fn request_radio_enable(&mut self);

    /// Asks the user to turn on location services. Answered with
    /// [`GateEvent::LocationEnableResult`].
    fn request_location_enable(&mut self);

    /// Registers for found-device and discovery-finished notifications.
    fn subscribe_discovery(&mut self) -> Subscription;

    /// Drops a registration. Fails with [`Error::NotSubscribed`](crate::Error::NotSubscribed)
    /// if `subscription` is not registered.
    fn unsubscribe_discovery(&mut self, subscription: Subscription) -> Result<()>;

    /// Starts a discovery operation. Returns false if the host refused to start one.
    fn start_discovery(&mut self) -> bool;

    /// Cancels the running discovery operation, if any.
    fn cancel_discovery(&mut self) -> bool;

    fn is_discovering(&self) -> bool;

    /// Devices previously paired with the host.
    fn bonded_devices(&self) -> Vec<RawDevice>;
}

/// Result of a remediation prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateEvent {
    /// Outcome of a permission prompt. Both sets are empty if the prompt was dismissed.
    CapabilityResult {
        granted: Capabilities,
        denied: Capabilities,
    },
    /// Whether the user agreed to power on the radio.
    RadioEnableResult(bool),
    /// Whether location services ended up enabled.
    LocationEnableResult(bool),
}

/// A discovery broadcast from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    DeviceFound {
        subscription: Subscription,
        device: RawDevice,
    },
    /// The host ended discovery on its own (timeout or external cancellation).
    DiscoveryFinished { subscription: Subscription },
}

/// Any callback the host delivers to scanplug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    Gate(GateEvent),
    Discovery(DiscoveryEvent),
}

impl From<GateEvent> for PlatformEvent {
    fn from(event: GateEvent) -> Self {
        PlatformEvent::Gate(event)
    }
}

impl From<DiscoveryEvent> for PlatformEvent {
    fn from(event: DiscoveryEvent) -> Self {
        PlatformEvent::Discovery(event)
    }
}
