// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parsing of rule-set source text into registry-ready domain types.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use warden_core::{
    ActionId, ActionKind, DiagnosticCategory, DiagnosticRule, Guard, RemediationAction,
    RiskLevel, RuleCondition, RuleId, Severity, Value,
};

/// Rule-set source format, mirroring the three encodings a file's
/// extension can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Hcl,
    Toml,
    Json,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("HCL parse error: {0}")]
    Hcl(#[from] hcl::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid value in {location}: {message}")]
    InvalidFormat { location: String, message: String },

    #[error("rule {0} is invalid: {1}")]
    InvalidRule(RuleId, String),

    #[error("action {0} is invalid: {1}")]
    InvalidAction(ActionId, String),

    #[error("action {location} has an invalid remediation command line: {message}")]
    InvalidCommand { location: String, message: String },
}

/// A loaded, fully-validated bundle of rules and the remediation actions
/// they reference.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub rules: Vec<DiagnosticRule>,
    pub actions: Vec<RemediationAction>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawCondition {
    field_path: String,
    operator: warden_core::ConditionOperator,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    threshold_severity: Option<Severity>,
    #[serde(default)]
    unit: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawGuard {
    field_path: String,
    operator: warden_core::ConditionOperator,
    #[serde(default)]
    value: Value,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
struct RawRule {
    version: u32,
    name: String,
    #[serde(default)]
    description: String,
    category: DiagnosticCategory,
    default_severity: Severity,
    #[serde(default = "default_true")]
    enabled: bool,
    supported_versions: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    schedule: Option<String>,
    #[serde(default, alias = "condition")]
    conditions: Vec<RawCondition>,
    #[serde(default)]
    auto_remediate: bool,
    #[serde(default)]
    remediation_action_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawAction {
    kind: ActionKind,
    operation: String,
    #[serde(default)]
    parameters: BTreeMap<String, Value>,
    risk_level: RiskLevel,
    #[serde(default)]
    requires_approval: bool,
    #[serde(default)]
    requires_downtime: bool,
    estimated_duration: String,
    #[serde(default)]
    can_rollback: bool,
    #[serde(default)]
    rollback_operation: Option<String>,
    #[serde(default)]
    rollback_parameters: BTreeMap<String, Value>,
    #[serde(default, alias = "pre_condition")]
    pre_conditions: Vec<RawGuard>,
    #[serde(default, alias = "post_condition")]
    post_conditions: Vec<RawGuard>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawRuleSet {
    #[serde(default, alias = "rule")]
    rules: HashMap<String, RawRule>,
    #[serde(default, alias = "action")]
    actions: HashMap<String, RawAction>,
}

/// Parse a duration string like `"30s"`, `"5m"`, `"1h"`.
///
/// Grounded in the same suffix table the daemon's scheduling code uses for
/// operator-facing duration strings, so a rule-set author who has written
/// one of those config files already knows this syntax.
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }
    let (num_str, suffix) = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| (&s[..i], &s[i..]))
        .unwrap_or((s, ""));
    let num: u64 = num_str.parse().map_err(|_| format!("invalid number in duration: {s}"))?;
    let multiplier = match suffix.trim() {
        "ms" | "millis" | "millisecond" | "milliseconds" => return Ok(Duration::from_millis(num)),
        "" | "s" | "sec" | "secs" | "second" | "seconds" => 1,
        "m" | "min" | "mins" | "minute" | "minutes" => 60,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3600,
        "d" | "day" | "days" => 86400,
        other => return Err(format!("unknown duration suffix: {other}")),
    };
    Ok(Duration::from_secs(num * multiplier))
}

fn to_guard(raw: RawGuard) -> Guard {
    Guard { field_path: raw.field_path, operator: raw.operator, value: raw.value }
}

fn to_condition(raw: RawCondition) -> RuleCondition {
    RuleCondition {
        field_path: raw.field_path,
        operator: raw.operator,
        value: raw.value,
        threshold_severity: raw.threshold_severity,
        unit: raw.unit,
    }
}

/// Validate a remediation command line with `warden-cmdguard`: it must
/// parse as a single simple command and every `$variable` reference must
/// be bound by the action's own `parameters`/`rollback_parameters` map.
fn validate_operation(
    location: &str,
    operation: &str,
    parameters: &BTreeMap<String, Value>,
) -> Result<(), LoadError> {
    let cmd = warden_cmdguard::SimpleCommand::parse(operation).map_err(|e| LoadError::InvalidCommand {
        location: location.to_string(),
        message: e.to_string(),
    })?;
    let bindings: HashMap<String, String> = parameters
        .iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
        .collect();
    warden_cmdguard::validate(&cmd, &bindings).map_err(|errs| LoadError::InvalidCommand {
        location: location.to_string(),
        message: errs.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "),
    })
}

fn build_rule(name: String, raw: RawRule) -> Result<DiagnosticRule, LoadError> {
    let rule = DiagnosticRule {
        id: RuleId::from_string(&name),
        version: raw.version,
        name: raw.name,
        description: raw.description,
        category: raw.category,
        default_severity: raw.default_severity,
        enabled: raw.enabled,
        supported_versions: raw.supported_versions,
        tags: raw.tags,
        schedule: raw.schedule,
        conditions: raw.conditions.into_iter().map(to_condition).collect(),
        auto_remediate: raw.auto_remediate,
        remediation_action_ids: raw.remediation_action_ids,
    };
    rule.validate().map_err(|msg| LoadError::InvalidRule(rule.id, msg))?;
    Ok(rule)
}

fn build_action(name: String, raw: RawAction) -> Result<RemediationAction, LoadError> {
    let id = ActionId::from_string(&name);
    let estimated_duration = parse_duration(&raw.estimated_duration).map_err(|message| {
        LoadError::InvalidFormat { location: format!("action.{name}.estimated_duration"), message }
    })?;

    validate_operation(&format!("action.{name}.operation"), &raw.operation, &raw.parameters)?;
    if let Some(ref rollback) = raw.rollback_operation {
        validate_operation(
            &format!("action.{name}.rollback_operation"),
            rollback,
            &raw.rollback_parameters,
        )?;
    }

    let action = RemediationAction {
        id,
        kind: raw.kind,
        operation: raw.operation,
        parameters: raw.parameters,
        risk_level: raw.risk_level,
        requires_approval: raw.requires_approval,
        requires_downtime: raw.requires_downtime,
        estimated_duration,
        can_rollback: raw.can_rollback,
        rollback_operation: raw.rollback_operation,
        rollback_parameters: raw.rollback_parameters,
        pre_conditions: raw.pre_conditions.into_iter().map(to_guard).collect(),
        post_conditions: raw.post_conditions.into_iter().map(to_guard).collect(),
    };
    action.validate().map_err(|msg| LoadError::InvalidAction(action.id, msg))?;
    Ok(action)
}

/// Parse rule-set source text in the given format into a [`RuleSet`].
pub fn parse_rule_set_with_format(content: &str, format: Format) -> Result<RuleSet, LoadError> {
    let raw: RawRuleSet = match format {
        Format::Hcl => hcl::from_str(content)?,
        Format::Toml => toml::from_str(content)?,
        Format::Json => serde_json::from_str(content)?,
    };

    let mut rules: Vec<DiagnosticRule> = raw
        .rules
        .into_iter()
        .map(|(name, rule)| build_rule(name, rule))
        .collect::<Result<_, _>>()?;
    rules.sort_by(|a, b| a.id.to_string().cmp(&b.id.to_string()));

    let mut actions: Vec<RemediationAction> = raw
        .actions
        .into_iter()
        .map(|(name, action)| build_action(name, action))
        .collect::<Result<_, _>>()?;
    actions.sort_by(|a, b| a.id.to_string().cmp(&b.id.to_string()));

    Ok(RuleSet { rules, actions })
}

/// Parse HCL rule-set source text (the default, operator-facing format).
pub fn parse_rule_set(content: &str) -> Result<RuleSet, LoadError> {
    parse_rule_set_with_format(content, Format::Hcl)
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
