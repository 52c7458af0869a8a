// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Diagnostic rules: declarative predicates plus metadata that yield a
//! finding when true (spec §3 `DiagnosticRule`).

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::time::Duration;

crate::define_id! {
    /// Identifies a rule independent of its version; a rule's true
    /// identity for registry purposes is `(RuleId, version)`.
    pub struct RuleId("rul-");
}

/// The five scanning domains named in spec §1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCategory {
    Performance,
    Security,
    Configuration,
    DataIntegrity,
    Conflicts,
}

crate::simple_display! {
    DiagnosticCategory {
        Performance => "performance",
        Security => "security",
        Configuration => "configuration",
        DataIntegrity => "data_integrity",
        Conflicts => "conflicts",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

crate::simple_display! {
    Severity {
        Info => "info",
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

/// Comparison/existence operator a [`RuleCondition`] evaluates with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Eq,
    Ne,
    Gt,
    Lt,
    Contains,
    Regex,
    Exists,
    NotExists,
}

crate::simple_display! {
    ConditionOperator {
        Eq => "eq",
        Ne => "ne",
        Gt => "gt",
        Lt => "lt",
        Contains => "contains",
        Regex => "regex",
        Exists => "exists",
        NotExists => "not_exists",
    }
}

/// A single AND-term of a rule. Rules needing OR are expressed as
/// multiple rules (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCondition {
    pub field_path: String,
    pub operator: ConditionOperator,
    /// Comparison operand. Unused (but present for schema uniformity) for
    /// `exists`/`not_exists`.
    #[serde(default)]
    pub value: Value,
    /// Overrides the rule's inherited severity when this condition is the
    /// one that trips, per spec §4.B ("severity from rule unless evidence
    /// includes a threshold override").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl RuleCondition {
    pub fn new(field_path: impl Into<String>, operator: ConditionOperator, value: Value) -> Self {
        Self {
            field_path: field_path.into(),
            operator,
            value,
            threshold_severity: None,
            unit: None,
        }
    }
}

/// A declarative defect predicate plus metadata (spec §3 `DiagnosticRule`).
///
/// Immutable once registered: a rule is never mutated during a scan, only
/// replaced wholesale by a higher-versioned registration (copy-on-update).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticRule {
    pub id: RuleId,
    pub version: u32,
    pub name: String,
    pub description: String,
    pub category: DiagnosticCategory,
    pub default_severity: Severity,
    pub enabled: bool,
    /// Glob patterns like `"10.*"` or `"*"`, matched by
    /// [`crate::registry::version_matches`].
    pub supported_versions: Vec<String>,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    pub conditions: Vec<RuleCondition>,
    #[serde(default)]
    pub auto_remediate: bool,
    #[serde(default)]
    pub remediation_action_ids: Vec<String>,
}

impl DiagnosticRule {
    /// Invariant per spec §3: `supported-versions` non-empty, condition
    /// list non-empty.
    pub fn validate(&self) -> Result<(), String> {
        if self.supported_versions.is_empty() {
            return Err(format!("rule {} has no supported_versions", self.id));
        }
        if self.conditions.is_empty() {
            return Err(format!("rule {} has no conditions", self.id));
        }
        Ok(())
    }
}

/// Scheduling hint a rule's `schedule` field parses into; the kernel does
/// not run a scheduler itself (that is external per spec §1), but carries
/// the parsed interval for the scanner/registry layer to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleInterval(pub Duration);

#[cfg(test)]
mod tests {
    use super::*;

    fn rule() -> DiagnosticRule {
        DiagnosticRule {
            id: RuleId::from_string("rul-cpu"),
            version: 1,
            name: "High CPU usage".into(),
            description: "CPU usage exceeds threshold".into(),
            category: DiagnosticCategory::Performance,
            default_severity: Severity::High,
            enabled: true,
            supported_versions: vec!["*".into()],
            tags: vec![],
            schedule: None,
            conditions: vec![RuleCondition::new(
                "performance.cpu_percent",
                ConditionOperator::Gt,
                Value::Float(80.0),
            )],
            auto_remediate: false,
            remediation_action_ids: vec![],
        }
    }

    #[test]
    fn validate_rejects_empty_supported_versions() {
        let mut r = rule();
        r.supported_versions.clear();
        assert!(r.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_conditions() {
        let mut r = rule();
        r.conditions.clear();
        assert!(r.validate().is_err());
    }

    #[test]
    fn validate_accepts_well_formed_rule() {
        assert!(rule().validate().is_ok());
    }
}
