// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn resolve_path_through_nested_map() {
    let v = map_from_paths([("performance.cpu_percent", Value::Float(92.0))]);
    assert_eq!(
        v.resolve_path("performance.cpu_percent"),
        Some(&Value::Float(92.0))
    );
}

#[test]
fn resolve_path_through_list_index() {
    let v = map_from_paths([(
        "plugins",
        Value::List(vec![Value::Str("a".into()), Value::Str("b".into())]),
    )]);
    assert_eq!(v.resolve_path("plugins.1"), Some(&Value::Str("b".into())));
}

#[test]
fn resolve_path_missing_segment_is_none_not_panic() {
    let v = map_from_paths([("performance.cpu_percent", Value::Float(92.0))]);
    assert_eq!(v.resolve_path("performance.missing"), None);
    assert_eq!(v.resolve_path("performance.cpu_percent.extra"), None);
}

#[test]
fn null_counts_as_present_value_not_absent() {
    let v = map_from_paths([("flag", Value::Null)]);
    assert_eq!(v.resolve_path("flag"), Some(&Value::Null));
}

#[test]
fn contains_substring_for_strings() {
    let v = Value::Str("connection reset by peer".into());
    assert!(v.contains(&Value::Str("reset".into())));
    assert!(!v.contains(&Value::Str("timeout".into())));
}

#[test]
fn contains_membership_for_lists() {
    let v = Value::List(vec![Value::Int(1), Value::Int(2)]);
    assert!(v.contains(&Value::Int(2)));
    assert!(!v.contains(&Value::Int(3)));
}
