// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The versioned event envelope (spec §6 "Event payload format").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_core::KernelEvent;

/// Current envelope schema version. Bumped only on a breaking change to
/// the envelope shape itself (not to individual `KernelEvent` variants,
/// which carry forward compatibility via `#[serde(other)] Custom`).
pub const ENVELOPE_VERSION: u32 = 1;

/// `{type, version, timestamp, systemId, scanId?, findingId?, attemptId?,
/// payload}` per spec §6. The flat `scan_id`/`finding_id`/`attempt_id`
/// fields are redundant with data already inside `event` but are kept at
/// the envelope's top level the way the teacher's `JobStatusEntry`/DTO
/// style flattens identity for external consumers who want to filter
/// without deserializing the full payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub version: u32,
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub system_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finding_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt_id: Option<String>,
    #[serde(flatten)]
    pub event: KernelEvent,
}

impl Envelope {
    pub fn new(seq: u64, system_id: impl Into<String>, event: KernelEvent, now: DateTime<Utc>) -> Self {
        Self {
            version: ENVELOPE_VERSION,
            seq,
            timestamp: now,
            system_id: system_id.into(),
            scan_id: None,
            finding_id: None,
            attempt_id: None,
            event,
        }
    }
}
