//! A scan with no registered scanner plugins still runs to completion and
//! is retrievable by id and by system-id filter (spec §8 scenario: a scan
//! always reaches a terminal status even when nothing detects anything —
//! the reference CLI ships no scanner plugins, matching spec §1's note
//! that scanners are external to the kernel).

use crate::prelude::*;

#[test]
fn a_scan_completes_and_is_visible_via_show_and_list() {
    let project = Project::empty();

    let run = project.warden().args(&["scan", "run", "--system", "sys-1", "--version", "12.0.0"]).passes();
    let scan = run.stdout_json();
    assert_eq!(scan["status"], "completed");
    assert_eq!(scan["system_id"], "sys-1");
    let scan_id = scan["id"].as_str().unwrap().to_string();

    let shown = project.warden().args(&["scan", "show", &scan_id]).passes().stdout_json();
    assert_eq!(shown["id"], scan_id);

    let listed = project.warden().args(&["scan", "list", "--system", "sys-1"]).passes().stdout_json();
    let scans = listed.as_array().unwrap();
    assert!(scans.iter().any(|s| s["id"] == scan_id));
}

#[test]
fn showing_an_unknown_scan_id_fails() {
    let project = Project::empty();
    project.warden().args(&["scan", "show", "scn-doesnotexist0000000"]).fails().stderr_has("not found");
}
