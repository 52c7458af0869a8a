// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::fs;
use tempfile::tempdir;

const RULE_A: &str = r#"
rule "rul-a" {
  version             = 1
  name                = "Rule A"
  category            = "security"
  default_severity    = "high"
  supported_versions  = ["*"]

  condition {
    field_path = "security.open_ports"
    operator   = "gt"
    value      = 0
  }
}
"#;

const RULE_B: &str = r#"
rule "rul-b" {
  version             = 1
  name                = "Rule B"
  category            = "configuration"
  default_severity    = "low"
  supported_versions  = ["*"]

  condition {
    field_path = "configuration.debug_mode"
    operator   = "eq"
    value      = true
  }
}
"#;

#[test]
fn find_rule_files_returns_empty_for_missing_directory() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");
    let files = find_rule_files(&missing).unwrap();
    assert!(files.is_empty());
}

#[test]
fn find_rule_files_walks_subdirectories_in_sorted_order() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("nested")).unwrap();
    fs::write(dir.path().join("b.hcl"), RULE_B).unwrap();
    fs::write(dir.path().join("nested/a.hcl"), RULE_A).unwrap();
    fs::write(dir.path().join("ignored.txt"), "not a rule file").unwrap();

    let files = find_rule_files(dir.path()).unwrap();
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|(_, fmt)| *fmt == Format::Hcl));
    assert!(files[0].0 < files[1].0);
}

#[test]
fn collect_all_rules_merges_rules_across_files() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.hcl"), RULE_A).unwrap();
    fs::write(dir.path().join("b.hcl"), RULE_B).unwrap();

    let merged = collect_all_rules(dir.path()).unwrap();
    assert_eq!(merged.rules.len(), 2);
    assert_eq!(merged.rules[0].id.to_string(), "rul-a");
    assert_eq!(merged.rules[1].id.to_string(), "rul-b");
}

#[test]
fn collect_all_rules_reports_every_failing_file() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("good.hcl"), RULE_A).unwrap();
    fs::write(dir.path().join("bad.hcl"), "rule \"rul-broken\" { version = 1 }").unwrap();

    let err = collect_all_rules(dir.path()).unwrap_err();
    match err {
        FindError::LoadErrors(count, details) => {
            assert_eq!(count, 1);
            assert!(details.contains("bad.hcl"));
        }
        FindError::Io(_) => panic!("expected LoadErrors"),
    }
}
