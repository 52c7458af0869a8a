// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure rule evaluation (spec §4.B). No I/O, no suspension points: a
//! `RuleEngine::evaluate` call is CPU-bounded and deterministic given the
//! same `data` and rule.

use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;
use thiserror::Error;
use warden_core::{ConditionOperator, DiagnosticRule, Evidence, Finding, FindingKey, RuleCondition, Severity, Value};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuleEngineError {
    #[error("rule {0} has an invalid regex at condition on {1}: {2}")]
    InvalidRegex(String, String, String),
}

/// Per-evaluation context a scanner supplies (spec §4.B: `component` and
/// `resourcePath` come from the scanner, not the rule).
#[derive(Debug, Clone)]
pub struct EvalContext {
    pub system_id: String,
    pub component: String,
    pub resource_path: String,
}

/// Compiles and caches `regex` conditions per rule id, since a rule is
/// immutable once registered (spec §4.B: "compile once and cache per
/// rule").
#[derive(Default)]
pub struct RuleEngine {
    regex_cache: Mutex<HashMap<(String, String), Regex>>,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// `evaluate(rule, data, ctx) -> finding?` per spec §4.B. Conditions
    /// are ANDed and short-circuit on the first failing term. A regex
    /// compilation failure returns `Err` so the caller (the Scanner) can
    /// disable the rule and emit `rule:misconfigured` without aborting
    /// the scan — it is never a finding.
    pub fn evaluate(
        &self,
        rule: &DiagnosticRule,
        data: &Value,
        ctx: &EvalContext,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Option<Finding>, RuleEngineError> {
        let mut trip: Option<&RuleCondition> = None;
        for condition in &rule.conditions {
            match self.condition_holds(rule.id.to_string(), condition, data)? {
                true => trip = Some(condition),
                false => return Ok(None),
            }
        }
        let Some(tripped) = trip else {
            return Ok(None);
        };

        let resolved = data.resolve_path(&tripped.field_path).cloned().unwrap_or(Value::Null);
        let severity = tripped.threshold_severity.unwrap_or(rule.default_severity);
        let key = FindingKey::new(
            ctx.system_id.clone(),
            rule.id,
            ctx.component.clone(),
            ctx.resource_path.clone(),
        );
        let mut finding = Finding::new(key, severity, now);
        finding.title = rule.name.clone();
        finding.description = rule.description.clone();
        finding.evidence = Evidence {
            actual: resolved,
            expected: tripped.value.clone(),
            difference: None,
            metadata: Default::default(),
        };
        finding.remediation_action_ids = rule
            .remediation_action_ids
            .iter()
            .map(warden_core::ActionId::from_string)
            .collect();
        finding.remediable = !finding.remediation_action_ids.is_empty();
        Ok(Some(finding))
    }

    fn condition_holds(
        &self,
        rule_id: String,
        condition: &RuleCondition,
        data: &Value,
    ) -> Result<bool, RuleEngineError> {
        let resolved = data.resolve_path(&condition.field_path);
        match condition.operator {
            ConditionOperator::Exists => Ok(resolved.is_some_and(|v| !v.is_null())),
            ConditionOperator::NotExists => Ok(resolved.is_none_or(|v| v.is_null())),
            ConditionOperator::Eq => Ok(resolved == Some(&condition.value)),
            ConditionOperator::Ne => Ok(resolved != Some(&condition.value)),
            ConditionOperator::Gt => Ok(Self::numeric_compare(resolved, &condition.value, |a, b| a > b)),
            ConditionOperator::Lt => Ok(Self::numeric_compare(resolved, &condition.value, |a, b| a < b)),
            ConditionOperator::Contains => Ok(resolved.map(|v| v.contains(&condition.value)).unwrap_or(false)),
            ConditionOperator::Regex => {
                let Some(Value::Str(haystack)) = resolved else {
                    return Ok(false);
                };
                let Value::Str(pattern) = &condition.value else {
                    return Ok(false);
                };
                let cache_key = (rule_id, condition.field_path.clone());
                let mut cache = self.regex_cache.lock();
                let compiled = match cache.get(&cache_key) {
                    Some(r) => r.clone(),
                    None => {
                        let r = Regex::new(pattern).map_err(|e| {
                            tracing::warn!(rule_id = %cache_key.0, field = %cache_key.1, error = %e, "invalid regex condition");
                            RuleEngineError::InvalidRegex(
                                cache_key.0.clone(),
                                cache_key.1.clone(),
                                e.to_string(),
                            )
                        })?;
                        cache.insert(cache_key, r.clone());
                        r
                    }
                };
                Ok(compiled.is_match(haystack))
            }
        }
    }

    /// Numeric comparisons reject non-numeric operands per spec §4.B
    /// ("skip with warning log — not a finding"), which here means the
    /// condition simply does not hold.
    fn numeric_compare(resolved: Option<&Value>, expected: &Value, cmp: impl Fn(f64, f64) -> bool) -> bool {
        let (Some(a), Some(b)) = (resolved.and_then(Value::as_f64), expected.as_f64()) else {
            return false;
        };
        cmp(a, b)
    }
}

#[cfg(test)]
#[path = "rule_engine_tests.rs"]
mod tests;
