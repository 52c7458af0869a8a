// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! warden-adapters: external-port implementations. `notify` is a real
//! desktop-notification sink; `connector` is a test/dev `ConnectorPort`
//! gated behind `test-support` (real CM-protocol connectors are external
//! per spec §1).

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod notify;

#[cfg(any(test, feature = "test-support"))]
pub mod connector;

pub use notify::{DesktopNotifyAdapter, NotifyAdapter, NotifyError};

#[cfg(any(test, feature = "test-support"))]
pub use connector::FakeConnector;
