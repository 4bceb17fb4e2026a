// scanplug Source Code File
//
// Copyright 2020 Nonpolynomial Labs LLC. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Method-channel encoding of the [`Scanner`] API.
//!
//! Consumers on the far side of a message channel (a UI isolate, a webview, another process) call
//! methods by name with JSON arguments and receive JSON results. Consumer events travel the other
//! way as calls to methods on the consumer.

use crate::api::{ConsumerEvent, ScanOptions, Scanner};
use crate::{Error, Result};
use futures::stream::StreamExt;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_cr as serde;
use serde_json::{json, Value};

pub const METHOD_START_SCAN: &str = "action_start_scan";
pub const METHOD_STOP_SCAN: &str = "action_stop_scan";
pub const METHOD_REQUEST_PERMISSIONS: &str = "action_request_permissions";

pub const EVENT_NEW_DEVICE: &str = "action_new_device";
pub const EVENT_SCAN_STOPPED: &str = "action_scan_stopped";

/// An inbound call from the consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "serde_cr")]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: &str, arguments: Value) -> Self {
        MethodCall {
            method: method.to_owned(),
            arguments,
        }
    }
}

/// The answer to a [`MethodCall`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "serde_cr", tag = "status", rename_all = "snake_case")]
pub enum MethodResult {
    Success {
        result: Value,
    },
    Error {
        code: String,
        message: String,
        details: Value,
    },
    NotImplemented,
}

impl From<Error> for MethodResult {
    fn from(error: Error) -> Self {
        MethodResult::Error {
            code: error.code().to_owned(),
            message: error.to_string(),
            details: Value::Null,
        }
    }
}

/// An outbound call to the consumer, carrying a [`ConsumerEvent`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(crate = "serde_cr")]
pub struct OutboundCall {
    pub method: &'static str,
    pub arguments: Value,
}

impl From<&ConsumerEvent> for OutboundCall {
    fn from(event: &ConsumerEvent) -> Self {
        match event {
            ConsumerEvent::NewDevice(record) => OutboundCall {
                method: EVENT_NEW_DEVICE,
                arguments: json!(record),
            },
            ConsumerEvent::ScanStopped => OutboundCall {
                method: EVENT_SCAN_STOPPED,
                arguments: Value::Null,
            },
        }
    }
}

/// Start-scan takes a single boolean: whether to return bonded devices. A missing argument means
/// `false`.
fn scan_options(arguments: &Value) -> Result<ScanOptions> {
    match arguments {
        Value::Null => Ok(ScanOptions::default()),
        Value::Bool(include_bonded) => Ok(ScanOptions {
            include_bonded: *include_bonded,
        }),
        other => Err(Error::InvalidArguments(format!(
            "{} expects a boolean, got {}",
            METHOD_START_SCAN, other
        ))),
    }
}

fn encode(result: Result<Value>) -> MethodResult {
    match result {
        Ok(result) => MethodResult::Success { result },
        Err(error) => error.into(),
    }
}

/// Runs `call` against `scanner`.
pub async fn handle_method_call<S: Scanner>(scanner: &S, call: &MethodCall) -> MethodResult {
    match call.method.as_str() {
        METHOD_START_SCAN => match scan_options(&call.arguments) {
            Ok(options) => encode(scanner.start_scan(options).await.map(|bonded| json!(bonded))),
            Err(error) => error.into(),
        },
        METHOD_STOP_SCAN => encode(scanner.stop_scan().await.map(|()| Value::Null)),
        METHOD_REQUEST_PERMISSIONS => {
            encode(scanner.request_permissions().await.map(|()| Value::Null))
        }
        other => {
            debug!("Unknown method {}", other);
            MethodResult::NotImplemented
        }
    }
}

/// Pushes every consumer event from `scanner` into `sink` until the scanner shuts down.
pub async fn forward_events<S, F>(scanner: &S, mut sink: F) -> Result<()>
where
    S: Scanner,
    F: FnMut(OutboundCall),
{
    let mut events = scanner.events().await?;
    while let Some(event) = events.next().await {
        sink(OutboundCall::from(&event));
    }
    Ok(())
}
