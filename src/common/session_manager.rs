// scanplug Source Code File
//
// Copyright 2020 Nonpolynomial Labs LLC. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Lifecycle of the single active scan.

use crate::api::{normalize, ConsumerEvent, DeviceRecord, DiscoveryEvent, Platform, Subscription};
use log::{debug, trace, warn};
use tokio::sync::broadcast;

/// A running scan. Exists exactly as long as discovery notifications are subscribed.
#[derive(Debug)]
struct ScanSession {
    subscription: Subscription,
    /// The session replaced one that was still running.
    restarted: bool,
}

#[derive(Debug)]
pub struct SessionManager {
    session: Option<ScanSession>,
    events_channel: broadcast::Sender<ConsumerEvent>,
}

impl SessionManager {
    pub fn new(events_channel: broadcast::Sender<ConsumerEvent>) -> Self {
        SessionManager {
            session: None,
            events_channel,
        }
    }

    pub fn emit(&self, event: ConsumerEvent) {
        if let Err(lost) = self.events_channel.send(event) {
            trace!("Lost consumer event, while nothing subscribed: {:?}", lost);
        }
    }

    pub fn subscription(&self) -> Option<Subscription> {
        self.session.as_ref().map(|s| s.subscription)
    }

    pub fn restarted(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.restarted)
    }

    /// Starts a new scan, stopping the running one first. Returns the normalized bonded devices
    /// if `include_bonded` is set.
    pub fn start<P: Platform>(
        &mut self,
        platform: &mut P,
        include_bonded: bool,
    ) -> Vec<DeviceRecord> {
        let restarted = self.session.is_some() || platform.is_discovering();
        if restarted {
            debug!("Scan already running, restarting it");
            self.stop(platform);
        }

        let subscription = platform.subscribe_discovery();
        self.session = Some(ScanSession {
            subscription,
            restarted,
        });
        if !platform.start_discovery() {
            warn!("Host refused to start discovery");
        }

        if include_bonded {
            platform.bonded_devices().iter().map(normalize).collect()
        } else {
            vec![]
        }
    }

    /// Stops the scan. Safe to call without a running scan; `ScanStopped` is emitted either way.
    pub fn stop<P: Platform>(&mut self, platform: &mut P) {
        platform.cancel_discovery();
        self.emit(ConsumerEvent::ScanStopped);

        match self.session.take() {
            Some(session) => {
                if let Err(err) = platform.unsubscribe_discovery(session.subscription) {
                    warn!("Failed to unsubscribe {:?}: {}", session.subscription, err);
                }
            }
            None => debug!("Stopping scan with no active session"),
        }
    }

    /// Forwards a discovery broadcast to consumers. Broadcasts delivered under any subscription
    /// other than the active one are dropped.
    pub fn on_discovery_event(&self, event: DiscoveryEvent) {
        let current = self.subscription();
        match event {
            DiscoveryEvent::DeviceFound {
                subscription,
                device,
            } if Some(subscription) == current => {
                self.emit(ConsumerEvent::NewDevice(normalize(&device)));
            }
            // The host ended discovery itself. Keep the subscription so late results still
            // arrive until the consumer stops the scan.
            DiscoveryEvent::DiscoveryFinished { subscription } if Some(subscription) == current => {
                self.emit(ConsumerEvent::ScanStopped);
            }
            event => trace!("Dropping discovery event outside active session: {:?}", event),
        }
    }
}
