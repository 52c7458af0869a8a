// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use warden_core::{map_from_paths, DiagnosticCategory, RuleId};

fn ctx() -> EvalContext {
    EvalContext {
        system_id: "sys-1".into(),
        component: "database".into(),
        resource_path: "/config/cpu".into(),
    }
}

fn cpu_rule() -> DiagnosticRule {
    DiagnosticRule {
        id: RuleId::from_string("rul-cpu"),
        version: 1,
        name: "High CPU".into(),
        description: "CPU usage too high".into(),
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
fn tripped_condition_yields_finding_with_expected_and_actual() {
    let engine = RuleEngine::new();
    let data = map_from_paths([("performance.cpu_percent", Value::Float(92.0))]);
    let finding = engine
        .evaluate(&cpu_rule(), &data, &ctx(), chrono::Utc::now())
        .unwrap()
        .expect("expected a finding");
    assert_eq!(finding.evidence.actual, Value::Float(92.0));
    assert_eq!(finding.evidence.expected, Value::Float(80.0));
    assert_eq!(finding.severity, Severity::High);
}

#[test]
fn untripped_condition_yields_no_finding() {
    let engine = RuleEngine::new();
    let data = map_from_paths([("performance.cpu_percent", Value::Float(10.0))]);
    assert!(engine
        .evaluate(&cpu_rule(), &data, &ctx(), chrono::Utc::now())
        .unwrap()
        .is_none());
}

#[test]
fn multiple_conditions_short_circuit_on_first_failure() {
    let engine = RuleEngine::new();
    let mut rule = cpu_rule();
    rule.conditions.push(RuleCondition::new(
        "performance.memory_percent",
        ConditionOperator::Gt,
        Value::Float(90.0),
    ));
    let data = map_from_paths([
        ("performance.cpu_percent", Value::Float(10.0)),
        ("performance.memory_percent", Value::Float(95.0)),
    ]);
    assert!(engine
        .evaluate(&rule, &data, &ctx(), chrono::Utc::now())
        .unwrap()
        .is_none());
}

#[test]
fn non_numeric_operand_against_gt_does_not_trip() {
    let engine = RuleEngine::new();
    let data = map_from_paths([("performance.cpu_percent", Value::Str("high".into()))]);
    assert!(engine
        .evaluate(&cpu_rule(), &data, &ctx(), chrono::Utc::now())
        .unwrap()
        .is_none());
}

#[test]
fn exists_treats_null_as_absent() {
    let engine = RuleEngine::new();
    let mut rule = cpu_rule();
    rule.conditions = vec![RuleCondition::new(
        "performance.disk_path",
        ConditionOperator::Exists,
        Value::Null,
    )];
    let data = map_from_paths([("performance.disk_path", Value::Null)]);
    assert!(engine
        .evaluate(&rule, &data, &ctx(), chrono::Utc::now())
        .unwrap()
        .is_none());
}

#[test]
fn regex_condition_matches_unanchored_by_default() {
    let engine = RuleEngine::new();
    let mut rule = cpu_rule();
    rule.conditions = vec![RuleCondition::new(
        "configuration.listen_address",
        ConditionOperator::Regex,
        Value::Str("0\\.0\\.0\\.0".into()),
    )];
    let data = map_from_paths([(
        "configuration.listen_address",
        Value::Str("tcp://0.0.0.0:5432".into()),
    )]);
    assert!(engine
        .evaluate(&rule, &data, &ctx(), chrono::Utc::now())
        .unwrap()
        .is_some());
}

#[test]
fn invalid_regex_disables_rule_with_error_not_panic() {
    let engine = RuleEngine::new();
    let mut rule = cpu_rule();
    rule.conditions = vec![RuleCondition::new(
        "configuration.listen_address",
        ConditionOperator::Regex,
        Value::Str("(unterminated".into()),
    )];
    let data = map_from_paths([("configuration.listen_address", Value::Str("x".into()))]);
    let err = engine.evaluate(&rule, &data, &ctx(), chrono::Utc::now()).unwrap_err();
    assert!(matches!(err, RuleEngineError::InvalidRegex(_, _, _)));
}

#[test]
fn regex_is_compiled_once_and_cached_per_rule() {
    let engine = RuleEngine::new();
    let mut rule = cpu_rule();
    rule.conditions = vec![RuleCondition::new(
        "configuration.listen_address",
        ConditionOperator::Regex,
        Value::Str("abc".into()),
    )];
    let data = map_from_paths([("configuration.listen_address", Value::Str("xabcx".into()))]);
    for _ in 0..3 {
        assert!(engine
            .evaluate(&rule, &data, &ctx(), chrono::Utc::now())
            .unwrap()
            .is_some());
    }
    assert_eq!(engine.regex_cache.lock().len(), 1);
}

#[test]
fn contains_matches_substring_and_list_membership() {
    let engine = RuleEngine::new();
    let mut rule = cpu_rule();
    rule.conditions = vec![RuleCondition::new(
        "configuration.tags",
        ConditionOperator::Contains,
        Value::Str("legacy".into()),
    )];
    let data = map_from_paths([(
        "configuration.tags",
        Value::List(vec![Value::Str("legacy".into()), Value::Str("prod".into())]),
    )]);
    assert!(engine
        .evaluate(&rule, &data, &ctx(), chrono::Utc::now())
        .unwrap()
        .is_some());
}

// Spec §8 quantified invariant: "Rule determinism" — `evaluate(rule, data)`
// is a pure function of its inputs: the same rule, data, context, and
// instant always yield the same finding (or absence of one).
mod determinism_prop {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn evaluate_is_pure_over_arbitrary_cpu_readings(cpu_percent in -50.0f64..150.0) {
            let engine = RuleEngine::new();
            let data = map_from_paths([("performance.cpu_percent", Value::Float(cpu_percent))]);
            let now = chrono::Utc::now();

            let first = engine.evaluate(&cpu_rule(), &data, &ctx(), now).unwrap();
            let second = engine.evaluate(&cpu_rule(), &data, &ctx(), now).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
