// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Findings: recorded defects with identity, evidence, and lifecycle
//! (spec §3 `Finding`).

use crate::rule::{RuleId, Severity};
use crate::value::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::define_id! {
    pub struct FindingId("fnd-");
}

/// Deterministic merge key: `(systemId, ruleId, component, resourcePath)`.
///
/// A finding is unique by this key within one open (unresolved) lifetime;
/// re-detection under the same key coalesces rather than creating a new
/// finding (spec §3 invariant, §8 "idempotent upsert").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FindingKey {
    pub system_id: String,
    pub rule_id: RuleId,
    pub component: String,
    pub resource_path: String,
}

impl FindingKey {
    pub fn new(
        system_id: impl Into<String>,
        rule_id: RuleId,
        component: impl Into<String>,
        resource_path: impl Into<String>,
    ) -> Self {
        Self {
            system_id: system_id.into(),
            rule_id,
            component: component.into(),
            resource_path: resource_path.into(),
        }
    }
}

/// Evidence captured at detection time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub actual: Value,
    pub expected: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difference: Option<Value>,
    #[serde(default)]
    pub metadata: std::collections::BTreeMap<String, Value>,
}

/// One entry in a finding's remediation history — a terminal
/// [`crate::remediation::RemediationAttempt`] summarized for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationHistoryEntry {
    pub attempt_id: crate::remediation::AttemptId,
    pub action_id: crate::remediation::ActionId,
    pub status: crate::remediation::AttemptStatus,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: FindingId,
    pub key: FindingKey,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub impact: String,
    pub recommendation: String,
    pub evidence: Evidence,
    pub detected_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub occurrence_count: u64,
    pub remediable: bool,
    pub remediation_action_ids: Vec<crate::remediation::ActionId>,
    #[serde(default)]
    pub remediation_history: Vec<RemediationHistoryEntry>,
    #[serde(default)]
    pub acknowledged: bool,
    #[serde(default)]
    pub resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    #[serde(default)]
    pub false_positive: bool,
}

impl Finding {
    pub fn new(key: FindingKey, severity: Severity, now: DateTime<Utc>) -> Self {
        Self {
            id: FindingId::new(),
            key,
            severity,
            title: String::new(),
            description: String::new(),
            impact: String::new(),
            recommendation: String::new(),
            evidence: Evidence {
                actual: Value::Null,
                expected: Value::Null,
                difference: None,
                metadata: Default::default(),
            },
            detected_at: now,
            last_seen_at: now,
            occurrence_count: 1,
            remediable: false,
            remediation_action_ids: Vec::new(),
            remediation_history: Vec::new(),
            acknowledged: false,
            resolved: false,
            resolved_at: None,
            resolved_by: None,
            false_positive: false,
        }
    }

    /// Re-detection: copies `detected_at` forward, bumps `occurrence_count`,
    /// advances `last_seen_at`, and refreshes evidence/severity (spec §4.C
    /// step 4, §8 scenario 2).
    pub fn coalesce(&mut self, fresh: &Finding, now: DateTime<Utc>) {
        self.occurrence_count += 1;
        self.last_seen_at = now;
        self.evidence = fresh.evidence.clone();
        self.severity = fresh.severity;
    }

    /// Enforces `resolved ⇒ resolvedAt ∧ resolvedBy` (spec §3 invariant).
    pub fn mark_resolved(&mut self, by: impl Into<String>, now: DateTime<Utc>) {
        self.resolved = true;
        self.resolved_at = Some(now);
        self.resolved_by = Some(by.into());
    }

    /// Enforces `falsePositive ⇒ ¬remediable` (spec §3 invariant).
    pub fn mark_false_positive(&mut self) {
        self.false_positive = true;
        self.remediable = false;
    }

    pub fn is_open(&self) -> bool {
        !self.resolved
    }
}
