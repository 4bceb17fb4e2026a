//! Drives a scan against a simulated host that starts with nothing granted and a powered-off
//! radio. A "user" task accepts every prompt and the host reports a few devices.
//!
//! Run with `RUST_LOG=debug cargo run --example simulated_scan`.

use scanplug::api::{
    Capabilities, DeviceType, DiscoveryEvent, GateEvent, Platform, PlatformVersion, RawDevice,
    Subscription,
};
use scanplug::channel::{
    forward_events, handle_method_call, MethodCall, METHOD_START_SCAN, METHOD_STOP_SCAN,
};
use scanplug::orchestrator::Orchestrator;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::time;

#[derive(Debug)]
enum HostRequest {
    Capabilities(Capabilities),
    RadioEnable,
    LocationEnable,
    Discovery(Subscription),
}

#[derive(Debug, Default)]
struct HostState {
    granted: Capabilities,
    radio_enabled: bool,
    discovering: bool,
    subscription: Option<Subscription>,
    next_subscription: u64,
}

struct SimulatedHost {
    state: Arc<Mutex<HostState>>,
    requests: UnboundedSender<HostRequest>,
}

impl SimulatedHost {
    fn request(&self, request: HostRequest) {
        if let Err(lost) = self.requests.send(request) {
            log::warn!("Lost host request, host loop went away: {:?}", lost.0);
        }
    }
}

impl Platform for SimulatedHost {
    fn version(&self) -> PlatformVersion {
        PlatformVersion(33)
    }

    fn has_radio_adapter(&self) -> bool {
        true
    }

    fn granted_capabilities(&self) -> Capabilities {
        self.state.lock().unwrap().granted
    }

    fn is_radio_enabled(&self) -> bool {
        self.state.lock().unwrap().radio_enabled
    }

    fn is_location_enabled(&self) -> bool {
        false
    }

    fn request_capabilities(&mut self, capabilities: Capabilities) {
        self.request(HostRequest::Capabilities(capabilities));
    }

    fn request_radio_enable(&mut self) {
        self.request(HostRequest::RadioEnable);
    }

    fn request_location_enable(&mut self) {
        self.request(HostRequest::LocationEnable);
    }

    fn subscribe_discovery(&mut self) -> Subscription {
        let mut state = self.state.lock().unwrap();
        state.next_subscription += 1;
        let subscription = Subscription(state.next_subscription);
        state.subscription = Some(subscription);
        subscription
    }

    fn unsubscribe_discovery(&mut self, subscription: Subscription) -> scanplug::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.subscription == Some(subscription) {
            state.subscription = None;
            Ok(())
        } else {
            Err(scanplug::Error::NotSubscribed)
        }
    }

    fn start_discovery(&mut self) -> bool {
        let subscription = {
            let mut state = self.state.lock().unwrap();
            state.discovering = true;
            state.subscription
        };
        if let Some(subscription) = subscription {
            self.request(HostRequest::Discovery(subscription));
        }
        true
    }

    fn cancel_discovery(&mut self) -> bool {
        std::mem::replace(&mut self.state.lock().unwrap().discovering, false)
    }

    fn is_discovering(&self) -> bool {
        self.state.lock().unwrap().discovering
    }

    fn bonded_devices(&self) -> Vec<RawDevice> {
        vec![RawDevice::new(
            Some("Car Kit"),
            "10:20:30:40:50:60",
            DeviceType::Classic,
        )]
    }
}

/// Plays the user and the radio: accepts every prompt and reports devices once discovery runs.
async fn host_loop(
    scanner: Orchestrator,
    state: Arc<Mutex<HostState>>,
    mut requests: UnboundedReceiver<HostRequest>,
) -> scanplug::Result<()> {
    while let Some(request) = requests.recv().await {
        println!("host prompt: {:?}", request);
        time::sleep(Duration::from_millis(100)).await;
        match request {
            HostRequest::Capabilities(capabilities) => {
                state.lock().unwrap().granted = capabilities;
                scanner.notify(GateEvent::CapabilityResult {
                    granted: capabilities,
                    denied: Capabilities::empty(),
                })?;
            }
            HostRequest::RadioEnable => {
                state.lock().unwrap().radio_enabled = true;
                scanner.notify(GateEvent::RadioEnableResult(true))?;
            }
            HostRequest::LocationEnable => {
                scanner.notify(GateEvent::LocationEnableResult(true))?;
            }
            HostRequest::Discovery(subscription) => {
                let found = [
                    RawDevice::new(Some("Heart Rate"), "C0:FF:EE:00:00:01", DeviceType::Le),
                    RawDevice::new(None, "C0:FF:EE:00:00:02", DeviceType::Le),
                    RawDevice::new(Some("Speaker"), "C0:FF:EE:00:00:03", DeviceType::Dual),
                ];
                for device in found {
                    scanner.notify(DiscoveryEvent::DeviceFound {
                        subscription,
                        device,
                    })?;
                }
                scanner.notify(DiscoveryEvent::DiscoveryFinished { subscription })?;
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let state = Arc::new(Mutex::new(HostState::default()));
    let (requests, receiver) = unbounded_channel();
    let scanner = Orchestrator::new(SimulatedHost {
        state: state.clone(),
        requests,
    });

    tokio::spawn(host_loop(scanner.clone(), state, receiver));
    let events = scanner.clone();
    tokio::spawn(async move {
        forward_events(&events, |call| {
            println!("-> {}", serde_json::to_string(&call).unwrap_or_default())
        })
        .await
    });

    let result =
        handle_method_call(&scanner, &MethodCall::new(METHOD_START_SCAN, json!(true))).await;
    println!("start: {}", serde_json::to_string(&result)?);

    time::sleep(Duration::from_secs(1)).await;

    let result =
        handle_method_call(&scanner, &MethodCall::new(METHOD_STOP_SCAN, Value::Null)).await;
    println!("stop: {}", serde_json::to_string(&result)?);

    time::sleep(Duration::from_millis(100)).await;
    Ok(())
}
