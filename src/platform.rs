//! Compile-time checks that the exported types can cross the host's callback threads.

use crate::api::{
    Capabilities, ConsumerEvent, DeviceRecord, PlatformEvent, RawDevice, Scanner, Subscription,
};
use crate::orchestrator::Orchestrator;
use static_assertions::assert_impl_all;
use std::{fmt::Debug, hash::Hash};

assert_impl_all!(Orchestrator: Scanner, Clone, Debug, Send, Sized, Sync);
assert_impl_all!(PlatformEvent: Clone, Debug, Send, Sync);
assert_impl_all!(ConsumerEvent: Clone, Debug, Send, Sync);
assert_impl_all!(RawDevice: Clone, Debug, Send, Sync);
assert_impl_all!(
    DeviceRecord: Clone,
    Debug,
    Hash,
    Eq,
    PartialEq,
    Send,
    Sized,
    Sync
);
assert_impl_all!(Subscription: Copy, Debug, Hash, Ord, Send, Sync);
assert_impl_all!(Capabilities: Copy, Debug, Default, Hash, Eq, Send, Sync);
