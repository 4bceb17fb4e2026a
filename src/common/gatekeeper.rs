// scanplug Source Code File
//
// Copyright 2020 Nonpolynomial Labs LLC. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Ordered precondition gates in front of every radio operation.
//!
//! The gates are checked in order (capabilities, radio power, location service) and remediation
//! stops at the first unmet one, since the host can only show one prompt at a time and each
//! prompt only makes sense once the previous gate holds. While a prompt is open the caller's
//! continuation is parked in the gatekeeper until the matching [`GateEvent`] arrives.

use crate::api::{required_capabilities, GateEvent, Platform};
use crate::Error;
use log::{debug, warn};

/// One precondition gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Capabilities,
    Radio,
    Location,
}

/// Outcome of a gate evaluation for a continuation `T`.
#[must_use]
#[derive(Debug)]
pub enum Verdict<T> {
    /// Every gate holds. The continuation may run.
    Granted(T),
    /// A remediation prompt was declined.
    Refused(T, Error),
    /// A prompt is open and the continuation is parked.
    Pending,
}

#[derive(Debug)]
struct PendingGate<T> {
    gate: Gate,
    continuation: T,
}

/// Holds at most one parked continuation.
#[derive(Debug)]
pub struct Gatekeeper<T> {
    pending: Option<PendingGate<T>>,
}

impl<T> Default for Gatekeeper<T> {
    fn default() -> Self {
        Gatekeeper { pending: None }
    }
}

impl<T> Gatekeeper<T> {
    /// The gate whose prompt is currently open, if any.
    pub fn pending_gate(&self) -> Option<Gate> {
        self.pending.as_ref().map(|p| p.gate)
    }

    /// Evaluates the gates and either grants `continuation` right away or parks it behind the
    /// first unmet gate's prompt.
    ///
    /// Any continuation that is already waiting is discarded, whether or not the new one is
    /// granted on the spot. The discarded continuation is returned to nobody and never resolved.
    pub fn ensure<P: Platform>(&mut self, platform: &mut P, continuation: T) -> Verdict<T> {
        if let Some(preempted) = self.pending.take() {
            warn!(
                "Gated request waiting on {:?} preempted by a new request",
                preempted.gate
            );
        }

        let gate = match first_unmet_gate(platform) {
            None => return Verdict::Granted(continuation),
            Some(gate) => gate,
        };
        self.pending = Some(PendingGate { gate, continuation });

        debug!("Remediating {:?} gate", gate);
        match gate {
            Gate::Capabilities => {
                let required = required_capabilities(platform.version());
                debug!(
                    "Requesting {} on {}",
                    required.permission_names().join(", "),
                    platform.version()
                );
                platform.request_capabilities(required)
            }
            Gate::Radio => platform.request_radio_enable(),
            Gate::Location => platform.request_location_enable(),
        }
        Verdict::Pending
    }

    /// Feeds a prompt result into the gatekeeper. Returns `None` if nothing was waiting on this
    /// kind of prompt.
    ///
    /// A positive capability or radio result re-evaluates every gate from the start, so the
    /// continuation may end up parked again behind the next unmet gate.
    pub fn resolve<P: Platform>(
        &mut self,
        platform: &mut P,
        event: GateEvent,
    ) -> Option<Verdict<T>> {
        let gate = match event {
            GateEvent::CapabilityResult { .. } => Gate::Capabilities,
            GateEvent::RadioEnableResult(_) => Gate::Radio,
            GateEvent::LocationEnableResult(_) => Gate::Location,
        };
        match &self.pending {
            Some(pending) if pending.gate == gate => {}
            Some(pending) => {
                warn!(
                    "Ignoring {:?} result while waiting on {:?}",
                    gate, pending.gate
                );
                return None;
            }
            None => {
                debug!("Ignoring {:?} result, nothing is waiting", gate);
                return None;
            }
        }
        let continuation = self.pending.take()?.continuation;

        let verdict = match event {
            GateEvent::CapabilityResult { granted, denied } => {
                if !denied.is_empty() {
                    Verdict::Refused(continuation, Error::PermissionDenied(denied))
                } else if granted.is_empty() {
                    Verdict::Refused(continuation, Error::PermissionRequestCancelled)
                } else {
                    self.ensure(platform, continuation)
                }
            }
            GateEvent::RadioEnableResult(true) => self.ensure(platform, continuation),
            GateEvent::RadioEnableResult(false) => {
                Verdict::Refused(continuation, Error::RadioDisabled)
            }
            GateEvent::LocationEnableResult(true) => Verdict::Granted(continuation),
            GateEvent::LocationEnableResult(false) => {
                Verdict::Refused(continuation, Error::LocationDisabled)
            }
        };
        Some(verdict)
    }
}

fn first_unmet_gate<P: Platform>(platform: &P) -> Option<Gate> {
    let required = required_capabilities(platform.version());
    if !platform.granted_capabilities().contains(required) {
        Some(Gate::Capabilities)
    } else if !platform.is_radio_enabled() {
        Some(Gate::Radio)
    } else if !platform.is_location_enabled() {
        Some(Gate::Location)
    } else {
        None
    }
}
