// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remediation actions and attempts (spec §3 `RemediationAction`,
//! `RemediationAttempt`, §4.G).

use crate::snapshot::SnapshotId;
use crate::value::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

crate::define_id! {
    pub struct ActionId("act-");
}

crate::define_id! {
    pub struct AttemptId("att-");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Automatic,
    SemiAutomatic,
    Manual,
}

crate::simple_display! {
    ActionKind {
        Automatic => "automatic",
        SemiAutomatic => "semi_automatic",
        Manual => "manual",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

crate::simple_display! {
    RiskLevel {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

/// A single boolean-evaluated guard, checked via the Rule Engine's
/// condition machinery against freshly-extracted data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guard {
    pub field_path: String,
    pub operator: crate::rule::ConditionOperator,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationAction {
    pub id: ActionId,
    pub kind: ActionKind,
    pub operation: String,
    pub parameters: BTreeMap<String, Value>,
    pub risk_level: RiskLevel,
    pub requires_approval: bool,
    pub requires_downtime: bool,
    pub estimated_duration: Duration,
    pub can_rollback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_operation: Option<String>,
    #[serde(default)]
    pub rollback_parameters: BTreeMap<String, Value>,
    #[serde(default)]
    pub pre_conditions: Vec<Guard>,
    #[serde(default)]
    pub post_conditions: Vec<Guard>,
}

impl RemediationAction {
    /// `riskLevel=high ⇒ requiresApproval=true` (spec §3 invariant).
    /// `canRollback=false ⇒ changes must be idempotent or tagged
    /// non-reversible` is a documentation-level obligation on the action
    /// author; it cannot be checked structurally, so it is not asserted
    /// here.
    pub fn validate(&self) -> Result<(), String> {
        if self.risk_level == RiskLevel::High && !self.requires_approval {
            return Err(format!(
                "action {} is high risk but does not require approval",
                self.id
            ));
        }
        if self.can_rollback && self.rollback_operation.is_none() {
            return Err(format!(
                "action {} claims can_rollback but has no rollback_operation",
                self.id
            ));
        }
        Ok(())
    }

    /// Per-action timeout: `estimatedDuration × 3`, clamped to `[30s, 10min]`
    /// (spec §4.G step 5).
    pub fn execution_timeout(&self) -> Duration {
        let tripled = self.estimated_duration * 3;
        tripled.clamp(Duration::from_secs(30), Duration::from_secs(600))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Pending,
    Approved,
    Executing,
    Completed,
    Failed,
    RolledBack,
}

crate::simple_display! {
    AttemptStatus {
        Pending => "pending",
        Approved => "approved",
        Executing => "executing",
        Completed => "completed",
        Failed => "failed",
        RolledBack => "rolled_back",
    }
}

impl AttemptStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AttemptStatus::Completed | AttemptStatus::Failed | AttemptStatus::RolledBack
        )
    }

    /// Valid next states from `self` under the state machine of spec §4.G:
    /// `pending → approved → executing → {completed|failed} → (optional)
    /// rolled-back`.
    pub fn can_transition_to(&self, next: AttemptStatus) -> bool {
        use AttemptStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Approved, Executing)
                | (Executing, Completed)
                | (Executing, Failed)
                | (Completed, RolledBack)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub before: Value,
    pub after: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationAttempt {
    pub id: AttemptId,
    pub finding_id: crate::finding::FindingId,
    pub action_id: ActionId,
    pub status: AttemptStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes_made: Option<ChangeSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<SnapshotId>,
    #[serde(default)]
    pub dry_run: bool,
}

impl RemediationAttempt {
    pub fn new(finding_id: crate::finding::FindingId, action_id: ActionId) -> Self {
        Self {
            id: AttemptId::new(),
            finding_id,
            action_id,
            status: AttemptStatus::Pending,
            started_at: None,
            completed_at: None,
            executed_by: None,
            approved_by: None,
            success: false,
            output: None,
            error: None,
            changes_made: None,
            snapshot_id: None,
            dry_run: false,
        }
    }

    /// Attempts an in-place transition, enforcing the state machine.
    /// Returns `Err` (the rejected target state) on an illegal move,
    /// matching spec §7 `ILLEGAL_STATE`.
    pub fn transition(&mut self, next: AttemptStatus) -> Result<(), AttemptStatus> {
        if !self.status.can_transition_to(next) {
            return Err(next);
        }
        self.status = next;
        Ok(())
    }

    /// `rolled-back ⇒ a prior completed, successful attempt exists`
    /// (spec §3 invariant) — checked at the call site since it requires
    /// `self.success` to have been true before the rollback transition.
    pub fn can_roll_back(&self) -> bool {
        self.status == AttemptStatus::Completed && self.success
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub applicable: bool,
    pub finding_open: bool,
    pub pre_conditions_met: bool,
    pub estimated_impact: String,
    pub reasons: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.applicable && self.finding_open && self.pre_conditions_met
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemediationResult {
    pub attempt: RemediationAttempt,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RollbackResult {
    pub attempt: RemediationAttempt,
    pub restored: bool,
}

/// Options controlling one `execute` call (spec §4.G, §6 config overrides).
#[derive(Debug, Clone, Default)]
pub struct RemediationOptions {
    pub approved_by: Option<String>,
    pub executed_by: Option<String>,
    pub dry_run: bool,
}
