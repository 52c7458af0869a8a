// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kernel lifecycle events (spec §4.H, §6 "Event payload format").
//!
//! Serializes as `{"type": "scan:started", ...}`, colon-namespaced exactly
//! as the teacher's job/agent event set does, with a catch-all `Custom`
//! variant for forward compatibility — external subscribers must not
//! break when a new event variant is added.

use crate::finding::FindingId;
use crate::remediation::{ActionId, AttemptId};
use crate::rule::Severity;
use crate::scan::ScanId;
use crate::snapshot::SnapshotId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum KernelEvent {
    #[serde(rename = "scan:started")]
    ScanStarted { scan_id: ScanId, system_id: String },

    #[serde(rename = "scan:progress")]
    ScanProgress {
        scan_id: ScanId,
        progress: u8,
        completed_tasks: u32,
        total_tasks: u32,
    },

    #[serde(rename = "scan:completed")]
    ScanCompleted {
        scan_id: ScanId,
        findings_total: u64,
    },

    #[serde(rename = "scan:failed")]
    ScanFailed { scan_id: ScanId, reason: String },

    #[serde(rename = "scan:cancelled")]
    ScanCancelled { scan_id: ScanId },

    #[serde(rename = "finding:created")]
    FindingCreated {
        scan_id: ScanId,
        finding_id: FindingId,
        severity: Severity,
    },

    #[serde(rename = "finding:updated")]
    FindingUpdated {
        finding_id: FindingId,
        occurrence_count: u64,
    },

    #[serde(rename = "finding:resolved")]
    FindingResolved {
        finding_id: FindingId,
        resolved_by: String,
    },

    #[serde(rename = "remediation:available")]
    RemediationAvailable {
        finding_id: FindingId,
        action_id: ActionId,
    },

    #[serde(rename = "remediation:approval-requested")]
    RemediationApprovalRequested {
        finding_id: FindingId,
        attempt_id: AttemptId,
    },

    #[serde(rename = "remediation:started")]
    RemediationStarted {
        finding_id: FindingId,
        attempt_id: AttemptId,
    },

    #[serde(rename = "remediation:completed")]
    RemediationCompleted {
        finding_id: FindingId,
        attempt_id: AttemptId,
        dry_run: bool,
    },

    #[serde(rename = "remediation:failed")]
    RemediationFailed {
        finding_id: FindingId,
        attempt_id: AttemptId,
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        snapshot_id: Option<SnapshotId>,
    },

    #[serde(rename = "remediation:rolled-back")]
    RemediationRolledBack {
        finding_id: FindingId,
        attempt_id: AttemptId,
    },

    #[serde(rename = "snapshot:created")]
    SnapshotCreated { snapshot_id: SnapshotId },

    #[serde(rename = "snapshot:restored")]
    SnapshotRestored { snapshot_id: SnapshotId },

    #[serde(rename = "snapshot:corrupt")]
    SnapshotCorrupt { snapshot_id: SnapshotId },

    /// Rule disabled for a scan due to a regex/field-path misconfiguration
    /// (spec §4.B "regex compilation failures disable the rule ... event
    /// published to the Event Bus but never abort the scan").
    #[serde(rename = "rule:misconfigured")]
    RuleMisconfigured {
        scan_id: ScanId,
        rule_id: crate::rule::RuleId,
        reason: String,
    },

    /// Forward-compatibility catch-all: unknown `type` tags deserialize
    /// here instead of failing.
    #[serde(other)]
    Custom,
}

impl KernelEvent {
    /// The topic key events are ordered by (spec §5 "Ordering guarantees":
    /// per scan id or per finding id, whichever the topic keys on).
    pub fn routing_key(&self) -> Option<String> {
        use KernelEvent::*;
        match self {
            ScanStarted { scan_id, .. }
            | ScanProgress { scan_id, .. }
            | ScanCompleted { scan_id, .. }
            | ScanFailed { scan_id, .. }
            | ScanCancelled { scan_id }
            | FindingCreated { scan_id, .. }
            | RuleMisconfigured { scan_id, .. } => Some(scan_id.to_string()),
            FindingUpdated { finding_id, .. }
            | FindingResolved { finding_id, .. }
            | RemediationAvailable { finding_id, .. }
            | RemediationApprovalRequested { finding_id, .. }
            | RemediationStarted { finding_id, .. }
            | RemediationCompleted { finding_id, .. }
            | RemediationFailed { finding_id, .. }
            | RemediationRolledBack { finding_id, .. } => Some(finding_id.to_string()),
            SnapshotCreated { snapshot_id }
            | SnapshotRestored { snapshot_id }
            | SnapshotCorrupt { snapshot_id } => Some(snapshot_id.to_string()),
            Custom => None,
        }
    }
}
