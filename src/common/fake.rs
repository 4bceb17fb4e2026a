//! In-memory host used by the unit tests.

use crate::api::{
    required_capabilities, Capabilities, Platform, PlatformVersion, RawDevice, Subscription,
};
use crate::{Error, Result};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    Capabilities(Capabilities),
    RadioEnable,
    LocationEnable,
}

#[derive(Debug)]
pub struct FakePlatform {
    pub version: PlatformVersion,
    pub has_adapter: bool,
    pub granted: Capabilities,
    pub radio_enabled: bool,
    pub location_enabled: bool,
    pub discovering: bool,
    pub bonded: Vec<RawDevice>,
    pub prompts: Vec<Prompt>,
    pub subscriptions: BTreeSet<Subscription>,
    pub discovery_starts: usize,
    pub discovery_cancels: usize,
    pub failed_unsubscribes: usize,
    next_subscription: u64,
}

impl FakePlatform {
    /// A host where every gate already holds.
    pub fn ready() -> Self {
        let version = PlatformVersion(33);
        FakePlatform {
            version,
            has_adapter: true,
            granted: required_capabilities(version),
            radio_enabled: true,
            location_enabled: true,
            discovering: false,
            bonded: vec![],
            prompts: vec![],
            subscriptions: BTreeSet::new(),
            discovery_starts: 0,
            discovery_cancels: 0,
            failed_unsubscribes: 0,
            next_subscription: 1,
        }
    }
}

impl Platform for FakePlatform {
    fn version(&self) -> PlatformVersion {
        self.version
    }

    fn has_radio_adapter(&self) -> bool {
        self.has_adapter
    }

    fn granted_capabilities(&self) -> Capabilities {
        self.granted
    }

    fn is_radio_enabled(&self) -> bool {
        self.radio_enabled
    }

    fn is_location_enabled(&self) -> bool {
        self.location_enabled
    }

    fn request_capabilities(&mut self, capabilities: Capabilities) {
        self.prompts.push(Prompt::Capabilities(capabilities));
    }

    fn request_radio_enable(&mut self) {
        self.prompts.push(Prompt::RadioEnable);
    }

    fn request_location_enable(&mut self) {
        self.prompts.push(Prompt::LocationEnable);
    }

    fn subscribe_discovery(&mut self) -> Subscription {
        let subscription = Subscription(self.next_subscription);
        self.next_subscription += 1;
        self.subscriptions.insert(subscription);
        subscription
    }

    fn unsubscribe_discovery(&mut self, subscription: Subscription) -> Result<()> {
        if self.subscriptions.remove(&subscription) {
            Ok(())
        } else {
            self.failed_unsubscribes += 1;
            Err(Error::NotSubscribed)
        }
    }

    fn start_discovery(&mut self) -> bool {
        self.discovery_starts += 1;
        self.discovering = true;
        true
    }

    fn cancel_discovery(&mut self) -> bool {
        self.discovery_cancels += 1;
        std::mem::replace(&mut self.discovering, false)
    }

    fn is_discovering(&self) -> bool {
        self.discovering
    }

    fn bonded_devices(&self) -> Vec<RawDevice> {
        self.bonded.clone()
    }
}

/// A [`FakePlatform`] that stays reachable from the test after being moved into the orchestrator.
#[derive(Debug, Clone)]
pub struct SharedPlatform(pub Arc<Mutex<FakePlatform>>);

impl SharedPlatform {
    pub fn new(platform: FakePlatform) -> Self {
        SharedPlatform(Arc::new(Mutex::new(platform)))
    }

    pub fn lock(&self) -> MutexGuard<'_, FakePlatform> {
        self.0.lock().unwrap()
    }
}

impl Platform for SharedPlatform {
    fn version(&self) -> PlatformVersion {
        self.lock().version()
    }

    fn has_radio_adapter(&self) -> bool {
        self.lock().has_radio_adapter()
    }

    fn granted_capabilities(&self) -> Capabilities {
        self.lock().granted_capabilities()
    }

    fn is_radio_enabled(&self) -> bool {
        self.lock().is_radio_enabled()
    }

    fn is_location_enabled(&self) -> bool {
        self.lock().is_location_enabled()
    }

    fn request_capabilities(&mut self, capabilities: Capabilities) {
        self.lock().request_capabilities(capabilities)
    }

    fn request_radio_enable(&mut self) {
        self.lock().request_radio_enable()
    }

    fn request_location_enable(&mut self) {
        self.lock().request_location_enable()
    }

    fn subscribe_discovery(&mut self) -> Subscription {
        self.lock().subscribe_discovery()
    }

    fn unsubscribe_discovery(&mut self, subscription: Subscription) -> Result<()> {
        self.lock().unsubscribe_discovery(subscription)
    }

    fn start_discovery(&mut self) -> bool {
        self.lock().start_discovery()
    }

    fn cancel_discovery(&mut self) -> bool {
        self.lock().cancel_discovery()
    }

    fn is_discovering(&self) -> bool {
        self.lock().is_discovering()
    }

    fn bonded_devices(&self) -> Vec<RawDevice> {
        self.lock().bonded_devices()
    }
}
