// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! warden-wire: the typed Event Bus (spec §4.H) and its wire envelope,
//! plus the length-prefixed JSON framing used by the out-of-scope
//! demonstration IPC transport.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod bus;
pub mod envelope;
pub mod framing;

pub use bus::{EventBus, InMemoryEventBus, Subscription, DEFAULT_SUBSCRIBER_CAPACITY};
pub use envelope::{Envelope, ENVELOPE_VERSION};
pub use framing::{decode, encode, read_message, write_message, ProtocolError};
