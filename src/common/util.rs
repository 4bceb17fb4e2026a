// scanplug Source Code File
//
// Copyright 2020 Nonpolynomial. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use crate::Result;
use futures::stream::{Stream, StreamExt};
use log::trace;
use std::fmt::Debug;
use std::pin::Pin;
use tokio::sync::{broadcast, oneshot};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};

/// Wraps a new receiver of `sender` into a stream. Items missed because the receiver lagged are
/// skipped.
pub fn event_stream<T>(sender: &broadcast::Sender<T>) -> Pin<Box<dyn Stream<Item = T> + Send>>
where
    T: Clone + Send + 'static,
{
    let receiver = sender.subscribe();
    Box::pin(BroadcastStream::new(receiver).filter_map(|x| async move {
        match x {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                trace!("Event stream lagged behind, skipped {} events", skipped);
                None
            }
        }
    }))
}

/// Hands `result` to whoever is waiting on `reply`. The caller may have given up, which is fine.
pub fn send_reply<T: Debug>(reply: oneshot::Sender<Result<T>>, result: Result<T>) {
    if let Err(lost) = reply.send(result) {
        trace!("Lost reply, caller went away: {:?}", lost);
    }
}
