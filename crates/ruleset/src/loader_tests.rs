// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const HCL_RULE_SET: &str = r#"
rule "rul-high-cpu" {
  version            = 1
  name               = "High CPU usage"
  description        = "CPU usage exceeds threshold"
  category           = "performance"
  default_severity   = "high"
  supported_versions = ["*"]
  tags               = ["cpu"]

  condition {
    field_path = "performance.cpu_percent"
    operator   = "gt"
    value      = 80.0
  }

  remediation_action_ids = ["act-restart-worker"]
}

action "act-restart-worker" {
  kind                = "semi_automatic"
  operation           = "systemctl restart $SERVICE"
  parameters          = { SERVICE = "app-worker" }
  risk_level          = "medium"
  requires_approval   = true
  estimated_duration  = "30s"
  can_rollback        = false
}
"#;

#[test]
fn parses_hcl_rule_and_action() {
    let set = parse_rule_set(HCL_RULE_SET).unwrap();
    assert_eq!(set.rules.len(), 1);
    assert_eq!(set.actions.len(), 1);

    let rule = &set.rules[0];
    assert_eq!(rule.id.to_string(), "rul-high-cpu");
    assert_eq!(rule.category, DiagnosticCategory::Performance);
    assert_eq!(rule.conditions.len(), 1);
    assert_eq!(rule.remediation_action_ids, vec!["act-restart-worker".to_string()]);

    let action = &set.actions[0];
    assert_eq!(action.id.to_string(), "act-restart-worker");
    assert_eq!(action.risk_level, RiskLevel::Medium);
    assert_eq!(action.estimated_duration, std::time::Duration::from_secs(30));
}

#[test]
fn rejects_high_risk_action_without_approval() {
    let src = r#"
action "act-drop-index" {
  kind               = "automatic"
  operation          = "drop-index"
  risk_level         = "high"
  requires_approval  = false
  estimated_duration = "5s"
  can_rollback       = false
}
"#;
    let err = parse_rule_set(src).unwrap_err();
    assert!(matches!(err, LoadError::InvalidAction(_, _)));
}

#[test]
fn rejects_rule_with_no_conditions() {
    let src = r#"
rule "rul-empty" {
  version             = 1
  name                = "Empty"
  category            = "security"
  default_severity    = "low"
  supported_versions  = ["*"]
}
"#;
    let err = parse_rule_set(src).unwrap_err();
    assert!(matches!(err, LoadError::InvalidRule(_, _)));
}

#[test]
fn rejects_action_with_disallowed_command() {
    let src = r#"
action "act-bad" {
  kind               = "automatic"
  operation           = "cat ../../etc/shadow"
  risk_level          = "low"
  estimated_duration  = "1s"
  can_rollback        = false
}
"#;
    let err = parse_rule_set(src).unwrap_err();
    assert!(matches!(err, LoadError::InvalidCommand { .. }));
}

#[test]
fn parses_toml_rule_set() {
    let src = r#"
[rule.rul-disk-full]
version = 1
name = "Disk nearly full"
category = "performance"
default_severity = "critical"
supported_versions = ["*"]

[[rule.rul-disk-full.condition]]
field_path = "performance.disk_percent"
operator = "gt"
value = 90.0
"#;
    let set = parse_rule_set_with_format(src, Format::Toml).unwrap();
    assert_eq!(set.rules.len(), 1);
    assert_eq!(set.rules[0].default_severity, Severity::Critical);
}

#[test]
fn parses_json_rule_set() {
    let src = r#"{
        "rule": {
            "rul-conflict": {
                "version": 1,
                "name": "Conflicting plugin",
                "category": "conflicts",
                "default_severity": "medium",
                "supported_versions": ["*"],
                "condition": [
                    { "field_path": "conflicts.plugin_count", "operator": "gt", "value": 1 }
                ]
            }
        }
    }"#;
    let set = parse_rule_set_with_format(src, Format::Json).unwrap();
    assert_eq!(set.rules.len(), 1);
    assert_eq!(set.rules[0].category, DiagnosticCategory::Conflicts);
}

#[test]
fn rollback_operation_is_validated_against_its_own_parameters() {
    let src = r#"
action "act-toggle-plugin" {
  kind                  = "semi_automatic"
  operation             = "plugin-disable $PLUGIN"
  parameters            = { PLUGIN = "broken-plugin" }
  risk_level            = "low"
  estimated_duration    = "5s"
  can_rollback          = true
  rollback_operation    = "plugin-enable $PLUGIN"
  rollback_parameters   = { PLUGIN = "broken-plugin" }
}
"#;
    let set = parse_rule_set(src).unwrap();
    assert_eq!(set.actions.len(), 1);
    assert!(set.actions[0].can_rollback);
}

#[test]
fn can_rollback_without_rollback_operation_is_rejected() {
    let src = r#"
action "act-broken" {
  kind               = "automatic"
  operation          = "noop"
  risk_level         = "low"
  estimated_duration = "1s"
  can_rollback       = true
}
"#;
    let err = parse_rule_set(src).unwrap_err();
    assert!(matches!(err, LoadError::InvalidAction(_, _)));
}

#[test]
fn rejects_malformed_estimated_duration() {
    let src = r#"
action "act-bad-duration" {
  kind               = "automatic"
  operation          = "noop"
  risk_level         = "low"
  estimated_duration = "banana"
  can_rollback       = false
}
"#;
    let err = parse_rule_set(src).unwrap_err();
    assert!(matches!(err, LoadError::InvalidFormat { .. }));
}
