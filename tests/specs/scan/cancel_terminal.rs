//! Cancelling an already-terminal scan is a no-op, not an error — the
//! orchestrator only arms cancellation for scans still in flight.

use crate::prelude::*;

#[test]
fn cancelling_a_completed_scan_succeeds_idempotently() {
    let project = Project::empty();

    let scan = project
        .warden()
        .args(&["scan", "run", "--system", "sys-1", "--version", "12.0.0"])
        .passes()
        .stdout_json();
    let scan_id = scan["id"].as_str().unwrap().to_string();
    assert_eq!(scan["status"], "completed");

    project.warden().args(&["scan", "cancel", &scan_id]).passes();
    project.warden().args(&["scan", "cancel", &scan_id]).passes();
}
