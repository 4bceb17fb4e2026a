// scanplug Source Code File
//
// Copyright 2020 Nonpolynomial Labs LLC. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! The entry point: routes consumer commands through the precondition gates to the scan session.
//!
//! The gatekeeper, the session and the [`Platform`] live in a single task and are only touched
//! from there. Consumer commands and host callbacks are funnelled into that task through one
//! queue, so they are handled strictly in the order they arrive.

use crate::api::{
    ConsumerEvent, DeviceRecord, Platform, PlatformEvent, ScanOptions, Scanner,
};
use crate::common::{
    gatekeeper::{Gatekeeper, Verdict},
    session_manager::SessionManager,
    util::{event_stream, send_reply},
};
use crate::{Error, Result};
use async_trait::async_trait;
use futures::stream::Stream;
use log::{debug, info};
use std::pin::Pin;
use tokio::sync::{broadcast, mpsc, oneshot};

/// Tuning knobs for an [`Orchestrator`].
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Consumer events buffered per event stream before a slow reader starts missing them.
    /// Missed events are skipped, not redelivered; the stream resumes with the oldest event still
    /// buffered.
    pub event_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig { event_capacity: 16 }
    }
}

type Reply<T> = oneshot::Sender<Result<T>>;

#[derive(Debug)]
enum Command {
    StartScan {
        options: ScanOptions,
        reply: Reply<Vec<DeviceRecord>>,
    },
    StopScan {
        reply: Reply<()>,
    },
    RequestPermissions {
        reply: Reply<()>,
    },
}

// Aggregate everything that can come in from the consumer and the host into a single type.
#[derive(Debug)]
enum Message {
    Command(Command),
    Platform(PlatformEvent),
}

/// A command waiting on the gates.
#[derive(Debug)]
enum GatedAction {
    StartScan {
        options: ScanOptions,
        reply: Reply<Vec<DeviceRecord>>,
    },
    RequestPermissions {
        reply: Reply<()>,
    },
}

impl GatedAction {
    fn refuse(self, error: Error) {
        info!("Gated request refused: {}", error);
        match self {
            GatedAction::StartScan { reply, .. } => send_reply(reply, Err(error)),
            GatedAction::RequestPermissions { reply } => send_reply(reply, Err(error)),
        }
    }
}

struct Core<P: Platform> {
    platform: P,
    gatekeeper: Gatekeeper<GatedAction>,
    session: SessionManager,
}

impl<P: Platform> Core<P> {
    fn new(platform: P, events_channel: broadcast::Sender<ConsumerEvent>) -> Self {
        Core {
            platform,
            gatekeeper: Gatekeeper::default(),
            session: SessionManager::new(events_channel),
        }
    }

    async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<Message>) {
        while let Some(message) = receiver.recv().await {
            self.handle(message);
        }
        debug!("All orchestrator handles dropped, loop finished");
    }

    fn handle(&mut self, message: Message) {
        match message {
            Message::Command(command) => self.handle_command(command),
            Message::Platform(PlatformEvent::Gate(event)) => {
                debug!("Gate result {:?}", event);
                if let Some(verdict) = self.gatekeeper.resolve(&mut self.platform, event) {
                    self.conclude(verdict);
                }
            }
            Message::Platform(PlatformEvent::Discovery(event)) => {
                self.session.on_discovery_event(event)
            }
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::StartScan { options, reply } => {
                self.gated(GatedAction::StartScan { options, reply })
            }
            Command::RequestPermissions { reply } => {
                self.gated(GatedAction::RequestPermissions { reply })
            }
            Command::StopScan { reply } => {
                info!("Stopping scan");
                self.session.stop(&mut self.platform);
                send_reply(reply, Ok(()));
            }
        }
    }

    fn gated(&mut self, action: GatedAction) {
        if !self.platform.has_radio_adapter() {
            action.refuse(Error::NoAdapter);
            return;
        }
        let verdict = self.gatekeeper.ensure(&mut self.platform, action);
        self.conclude(verdict);
    }

    fn conclude(&mut self, verdict: Verdict<GatedAction>) {
        match verdict {
            Verdict::Granted(action) => self.perform(action),
            Verdict::Refused(action, error) => action.refuse(error),
            Verdict::Pending => debug!(
                "Gated request waiting on {:?} prompt",
                self.gatekeeper.pending_gate()
            ),
        }
    }

    fn perform(&mut self, action: GatedAction) {
        match action {
            GatedAction::StartScan { options, reply } => {
                info!("Starting scan with {:?}", options);
                let bonded = self.session.start(&mut self.platform, options.include_bonded);
                if self.session.restarted() {
                    debug!("Scan restarted over a running one");
                }
                send_reply(reply, Ok(bonded));
            }
            GatedAction::RequestPermissions { reply } => send_reply(reply, Ok(())),
        }
    }
}

/// Handle to a running orchestrator. Cheap to clone; the orchestrator shuts down once every
/// handle is dropped.
///
/// Must be created from within a tokio runtime.
#[derive(Clone, Debug)]
pub struct Orchestrator {
    messages: mpsc::UnboundedSender<Message>,
    events_channel: broadcast::Sender<ConsumerEvent>,
}

impl Orchestrator {
    pub fn new<P: Platform>(platform: P) -> Self {
        Self::with_config(platform, OrchestratorConfig::default())
    }

    pub fn with_config<P: Platform>(platform: P, config: OrchestratorConfig) -> Self {
        let (events_channel, _) = broadcast::channel(config.event_capacity);
        let (messages, receiver) = mpsc::unbounded_channel();
        let core = Core::new(platform, events_channel.clone());
        tokio::spawn(core.run(receiver));
        Orchestrator {
            messages,
            events_channel,
        }
    }

    /// Delivers a host callback. Does not block, so it can be called straight from the host's
    /// callback thread.
    pub fn notify(&self, event: impl Into<PlatformEvent>) -> Result<()> {
        self.send(Message::Platform(event.into()))
    }

    fn send(&self, message: Message) -> Result<()> {
        self.messages.send(message).map_err(|_| Error::Shutdown)
    }

    async fn call<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, receiver) = oneshot::channel();
        self.send(Message::Command(command(reply)))?;
        // The reply is only ever dropped unanswered when a newer gated request replaced ours.
        receiver.await.map_err(|_| Error::Superseded)?
    }
}

#[async_trait]
impl Scanner for Orchestrator {
    async fn events(&self) -> Result<Pin<Box<dyn Stream<Item = ConsumerEvent> + Send>>> {
        Ok(event_stream(&self.events_channel))
    }

    async fn start_scan(&self, options: ScanOptions) -> Result<Vec<DeviceRecord>> {
        self.call(|reply| Command::StartScan { options, reply })
            .await
    }

    async fn stop_scan(&self) -> Result<()> {
        self.call(|reply| Command::StopScan { reply }).await
    }

    async fn request_permissions(&self) -> Result<()> {
        self.call(|reply| Command::RequestPermissions { reply })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        required_capabilities, Capabilities, DeviceType, DiscoveryEvent, GateEvent, RawDevice,
    };
    use crate::common::fake::{FakePlatform, Prompt, SharedPlatform};
    use futures::{poll, stream::StreamExt, FutureExt};

    type Events = Pin<Box<dyn Stream<Item = ConsumerEvent> + Send>>;

    fn ready_events(events: &mut Events) -> Vec<ConsumerEvent> {
        let mut ready = vec![];
        while let Some(Some(event)) = events.next().now_or_never() {
            ready.push(event);
        }
        ready
    }

    /// Lets the orchestrator task run until the host has shown `count` prompts.
    async fn settle(platform: &SharedPlatform, count: usize) {
        while platform.lock().prompts.len() < count {
            tokio::task::yield_now().await;
        }
    }

    async fn setup(platform: FakePlatform) -> (Orchestrator, SharedPlatform, Events) {
        let platform = SharedPlatform::new(platform);
        let scanner = Orchestrator::new(platform.clone());
        let events = scanner.events().await.unwrap();
        (scanner, platform, events)
    }

    #[tokio::test]
    async fn start_scan_returns_bonded_devices() {
        let mut fake = FakePlatform::ready();
        fake.bonded = vec![
            RawDevice::new(Some("Watch"), "00:00:00:00:00:01", DeviceType::Le),
            RawDevice::new(Some("Speaker"), "00:00:00:00:00:02", DeviceType::Classic),
        ];
        let (scanner, platform, mut events) = setup(fake).await;

        let bonded = scanner
            .start_scan(ScanOptions {
                include_bonded: true,
            })
            .await
            .unwrap();

        assert_eq!(
            bonded,
            vec![
                DeviceRecord {
                    name: "Watch-LE".into(),
                    address: "00:00:00:00:00:01".into(),
                },
                DeviceRecord {
                    name: "Speaker".into(),
                    address: "00:00:00:00:00:02".into(),
                },
            ]
        );
        assert!(ready_events(&mut events).is_empty());
        assert!(platform.lock().prompts.is_empty());
        assert_eq!(platform.lock().discovery_starts, 1);
    }

    #[tokio::test]
    async fn found_devices_are_streamed() {
        let (scanner, platform, mut events) = setup(FakePlatform::ready()).await;
        assert!(scanner
            .start_scan(ScanOptions::default())
            .await
            .unwrap()
            .is_empty());
        let subscription = *platform.lock().subscriptions.iter().next().unwrap();

        scanner
            .notify(DiscoveryEvent::DeviceFound {
                subscription,
                device: RawDevice::new(None, "AA:BB:CC:DD:EE:FF", DeviceType::Le),
            })
            .unwrap();
        scanner.stop_scan().await.unwrap();

        assert_eq!(
            ready_events(&mut events),
            vec![
                ConsumerEvent::NewDevice(DeviceRecord {
                    name: "No name-LE".into(),
                    address: "AA:BB:CC:DD:EE:FF".into(),
                }),
                ConsumerEvent::ScanStopped,
            ]
        );
        assert!(platform.lock().subscriptions.is_empty());
    }

    #[tokio::test]
    async fn stop_scan_without_session() {
        let (scanner, platform, mut events) = setup(FakePlatform::ready()).await;

        scanner.stop_scan().await.unwrap();

        assert_eq!(ready_events(&mut events), vec![ConsumerEvent::ScanStopped]);
        assert_eq!(platform.lock().failed_unsubscribes, 0);
    }

    #[tokio::test]
    async fn stop_scan_needs_no_adapter() {
        let mut fake = FakePlatform::ready();
        fake.has_adapter = false;
        let (scanner, _platform, mut events) = setup(fake).await;

        scanner.stop_scan().await.unwrap();
        assert_eq!(ready_events(&mut events), vec![ConsumerEvent::ScanStopped]);
    }

    #[tokio::test]
    async fn restart_emits_single_stop() {
        let (scanner, platform, mut events) = setup(FakePlatform::ready()).await;
        scanner.start_scan(ScanOptions::default()).await.unwrap();
        let first = *platform.lock().subscriptions.iter().next().unwrap();

        scanner.start_scan(ScanOptions::default()).await.unwrap();
        let second = *platform.lock().subscriptions.iter().next().unwrap();
        assert_ne!(first, second);
        assert_eq!(platform.lock().subscriptions.len(), 1);

        let device = RawDevice::new(Some("Tag"), "00:00:00:00:00:03", DeviceType::Classic);
        for subscription in [first, second] {
            scanner
                .notify(DiscoveryEvent::DeviceFound {
                    subscription,
                    device: device.clone(),
                })
                .unwrap();
        }
        scanner.stop_scan().await.unwrap();

        assert_eq!(
            ready_events(&mut events),
            vec![
                ConsumerEvent::ScanStopped,
                ConsumerEvent::NewDevice(DeviceRecord::from(&device)),
                ConsumerEvent::ScanStopped,
            ]
        );
    }

    #[tokio::test]
    async fn missing_adapter_fails_fast() {
        let mut fake = FakePlatform::ready();
        fake.has_adapter = false;
        let (scanner, platform, _events) = setup(fake).await;

        let err = scanner
            .start_scan(ScanOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoAdapter));
        assert_eq!(err.code(), "error_no_bt");
        let err = scanner.request_permissions().await.unwrap_err();
        assert!(matches!(err, Error::NoAdapter));
        assert!(platform.lock().prompts.is_empty());
    }

    #[tokio::test]
    async fn scan_waits_for_every_gate() {
        let mut fake = FakePlatform::ready();
        fake.granted = Capabilities::empty();
        fake.radio_enabled = false;
        fake.location_enabled = false;
        let (scanner, platform, mut events) = setup(fake).await;
        let version = platform.lock().version;

        let mut scan = scanner.start_scan(ScanOptions::default());
        assert!(poll!(&mut scan).is_pending());
        settle(&platform, 1).await;

        platform.lock().granted = required_capabilities(version);
        scanner
            .notify(GateEvent::CapabilityResult {
                granted: required_capabilities(version),
                denied: Capabilities::empty(),
            })
            .unwrap();
        settle(&platform, 2).await;
        assert!(poll!(&mut scan).is_pending());

        platform.lock().radio_enabled = true;
        scanner.notify(GateEvent::RadioEnableResult(true)).unwrap();
        settle(&platform, 3).await;
        scanner.notify(GateEvent::LocationEnableResult(true)).unwrap();

        assert_eq!(scan.await.unwrap(), vec![]);
        assert_eq!(
            platform.lock().prompts,
            vec![
                Prompt::Capabilities(required_capabilities(version)),
                Prompt::RadioEnable,
                Prompt::LocationEnable,
            ]
        );
        assert_eq!(platform.lock().subscriptions.len(), 1);
        assert!(ready_events(&mut events).is_empty());
    }

    #[tokio::test]
    async fn refused_gate_leaves_no_session() {
        let mut fake = FakePlatform::ready();
        fake.location_enabled = false;
        let (scanner, platform, mut events) = setup(fake).await;

        let mut scan = scanner.start_scan(ScanOptions::default());
        assert!(poll!(&mut scan).is_pending());
        scanner.notify(GateEvent::LocationEnableResult(false)).unwrap();

        let err = scan.await.unwrap_err();
        assert_eq!(err.code(), "error_no_gps");
        assert!(platform.lock().subscriptions.is_empty());
        assert_eq!(platform.lock().discovery_starts, 0);
        assert!(ready_events(&mut events).is_empty());
    }

    #[tokio::test]
    async fn request_permissions_reports_denial() {
        let mut fake = FakePlatform::ready();
        fake.granted = Capabilities::RADIO;
        let (scanner, _platform, _events) = setup(fake).await;

        let mut request = scanner.request_permissions();
        assert!(poll!(&mut request).is_pending());
        scanner
            .notify(GateEvent::CapabilityResult {
                granted: Capabilities::RADIO,
                denied: Capabilities::RADIO_SCAN | Capabilities::RADIO_CONNECT,
            })
            .unwrap();

        let err = request.await.unwrap_err();
        assert!(matches!(
            err,
            Error::PermissionDenied(denied)
                if denied == Capabilities::RADIO_SCAN | Capabilities::RADIO_CONNECT
        ));
    }

    #[tokio::test]
    async fn newer_request_supersedes_pending_one() {
        let mut fake = FakePlatform::ready();
        fake.granted = Capabilities::empty();
        let (scanner, platform, _events) = setup(fake).await;
        let version = platform.lock().version;

        let mut first = scanner.request_permissions();
        assert!(poll!(&mut first).is_pending());
        let mut second = scanner.start_scan(ScanOptions::default());
        assert!(poll!(&mut second).is_pending());
        settle(&platform, 2).await;

        platform.lock().granted = required_capabilities(version);
        scanner
            .notify(GateEvent::CapabilityResult {
                granted: required_capabilities(version),
                denied: Capabilities::empty(),
            })
            .unwrap();

        assert_eq!(second.await.unwrap(), vec![]);
        assert!(matches!(first.await, Err(Error::Superseded)));
        assert_eq!(platform.lock().prompts.len(), 2);
        assert_eq!(platform.lock().subscriptions.len(), 1);
    }

    #[tokio::test]
    async fn request_granted_on_the_spot_supersedes_pending_one() {
        let mut fake = FakePlatform::ready();
        fake.granted = Capabilities::empty();
        let (scanner, platform, mut events) = setup(fake).await;
        let version = platform.lock().version;

        let mut first = scanner.start_scan(ScanOptions::default());
        assert!(poll!(&mut first).is_pending());
        settle(&platform, 1).await;

        platform.lock().granted = required_capabilities(version);
        assert_eq!(
            scanner.start_scan(ScanOptions::default()).await.unwrap(),
            vec![]
        );
        assert!(matches!(first.await, Err(Error::Superseded)));

        // The late prompt result must not start a second scan.
        scanner
            .notify(GateEvent::CapabilityResult {
                granted: required_capabilities(version),
                denied: Capabilities::empty(),
            })
            .unwrap();
        scanner.stop_scan().await.unwrap();

        assert_eq!(platform.lock().discovery_starts, 1);
        assert_eq!(platform.lock().prompts.len(), 1);
        assert_eq!(ready_events(&mut events), vec![ConsumerEvent::ScanStopped]);
    }
}
