// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rule/scanner registry: built-in and plugin catalog with
//! version-compatibility filtering (spec §4.I).

use crate::rule::{DiagnosticCategory, DiagnosticRule, RuleId};
use indexmap::IndexMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistryError {
    #[error("rule {0} is already registered at version {1} or higher")]
    VersionConflict(RuleId, u32),
    #[error("rule {0} failed validation: {1}")]
    InvalidRule(RuleId, String),
}

/// Matches a CM-version string against a rule's glob pattern.
///
/// `*` matches any version; a trailing `*` segment (`"10.*"`) matches the
/// prefix up to that point as a major-line wildcard (spec §4.I).
pub fn version_matches(pattern: &str, version: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix(".*") {
        return version == prefix || version.starts_with(&format!("{prefix}."));
    }
    pattern == version
}

/// Holds the currently-registered rule catalog, keyed by rule id.
///
/// Only the highest version of each rule id is retained — registering a
/// lower-or-equal version is rejected with [`RegistryError::VersionConflict`]
/// (spec §4.I "registration is rejected on id conflict unless the plugin
/// supplies a strictly higher version"). Rules are immutable once
/// registered: replacement is always a whole-rule swap, never a mutation.
#[derive(Debug, Default)]
pub struct Registry {
    rules: IndexMap<RuleId, DiagnosticRule>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, rule: DiagnosticRule) -> Result<(), RegistryError> {
        rule.validate()
            .map_err(|e| RegistryError::InvalidRule(rule.id.clone(), e))?;
        if let Some(existing) = self.rules.get(&rule.id) {
            if rule.version <= existing.version {
                return Err(RegistryError::VersionConflict(rule.id, existing.version));
            }
        }
        self.rules.insert(rule.id.clone(), rule);
        Ok(())
    }

    pub fn get(&self, id: &RuleId) -> Option<&DiagnosticRule> {
        self.rules.get(id)
    }

    pub fn all(&self) -> impl Iterator<Item = &DiagnosticRule> {
        self.rules.values()
    }

    /// Resolves the effective rule set for a scan: union of explicitly
    /// requested rule ids and rules whose category is in `categories`,
    /// intersected with `enabled` and version-compatible (spec §4.D step 3).
    pub fn resolve(
        &self,
        requested: &[RuleId],
        categories: &[DiagnosticCategory],
        system_version: &str,
    ) -> Vec<&DiagnosticRule> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for rule in self.rules.values() {
            let matches_id = requested.contains(&rule.id);
            let matches_category = categories.contains(&rule.category);
            if !matches_id && !matches_category {
                continue;
            }
            if !rule.enabled {
                continue;
            }
            if !rule
                .supported_versions
                .iter()
                .any(|p| version_matches(p, system_version))
            {
                continue;
            }
            if seen.insert(rule.id.clone()) {
                out.push(rule);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{ConditionOperator, RuleCondition, Severity};
    use crate::value::Value;

    fn rule(id: &str, version: u32, versions: Vec<&str>) -> DiagnosticRule {
        DiagnosticRule {
            id: RuleId::from_string(id),
            version,
            name: "r".into(),
            description: String::new(),
            category: DiagnosticCategory::Performance,
            default_severity: Severity::Medium,
            enabled: true,
            supported_versions: versions.into_iter().map(String::from).collect(),
            tags: vec![],
            schedule: None,
            conditions: vec![RuleCondition::new(
                "x",
                ConditionOperator::Exists,
                Value::Null,
            )],
            auto_remediate: false,
            remediation_action_ids: vec![],
        }
    }

    #[test]
    fn glob_star_matches_any_version() {
        assert!(version_matches("*", "12.3.4"));
    }

    #[test]
    fn glob_prefix_matches_major_line() {
        assert!(version_matches("10.*", "10.5.0"));
        assert!(version_matches("10.*", "10"));
        assert!(!version_matches("10.*", "11.0.0"));
    }

    #[test]
    fn exact_pattern_matches_literal() {
        assert!(version_matches("9.2.1", "9.2.1"));
        assert!(!version_matches("9.2.1", "9.2.2"));
    }

    #[test]
    fn register_rejects_lower_or_equal_version() {
        let mut reg = Registry::new();
        reg.register(rule("rul-x", 2, vec!["*"])).unwrap();
        let err = reg.register(rule("rul-x", 2, vec!["*"])).unwrap_err();
        assert!(matches!(err, RegistryError::VersionConflict(_, 2)));
        let err = reg.register(rule("rul-x", 1, vec!["*"])).unwrap_err();
        assert!(matches!(err, RegistryError::VersionConflict(_, 2)));
    }

    #[test]
    fn register_accepts_strictly_higher_version() {
        let mut reg = Registry::new();
        reg.register(rule("rul-x", 1, vec!["*"])).unwrap();
        reg.register(rule("rul-x", 2, vec!["*"])).unwrap();
        assert_eq!(reg.get(&RuleId::from_string("rul-x")).unwrap().version, 2);
    }

    #[test]
    fn resolve_filters_disabled_and_incompatible_version() {
        let mut reg = Registry::new();
        let mut disabled = rule("rul-a", 1, vec!["*"]);
        disabled.enabled = false;
        reg.register(disabled).unwrap();
        reg.register(rule("rul-b", 1, vec!["10.*"])).unwrap();
        reg.register(rule("rul-c", 1, vec!["*"])).unwrap();

        let resolved = reg.resolve(&[], &[DiagnosticCategory::Performance], "11.0.0");
        let ids: Vec<_> = resolved.iter().map(|r| r.id.to_string()).collect();
        assert!(!ids.contains(&"rul-a".to_string()));
        assert!(!ids.contains(&"rul-b".to_string()));
        assert!(ids.contains(&"rul-c".to_string()));
    }
}
