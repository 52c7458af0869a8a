//! Referencing a rule id the registry doesn't know about is rejected
//! before any scan is created (spec §7 `INVALID_INPUT`: "no side effects
//! occurred").

use crate::prelude::*;

#[test]
fn an_unknown_rule_id_is_rejected_with_no_side_effects() {
    let project = Project::empty();

    project
        .warden()
        .args(&["scan", "run", "--system", "sys-1", "--version", "12.0.0", "--rule", "rul-doesnotexist"])
        .fails()
        .stderr_has("invalid input");

    let listed = project.warden().args(&["scan", "list", "--system", "sys-1"]).passes().stdout_json();
    assert!(listed.as_array().unwrap().is_empty());
}
