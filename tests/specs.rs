//! Black-box behavioral specifications for the `warden` CLI binary.
//!
//! Each test spawns `warden` as a subprocess against an isolated state
//! directory, matching how an operator would actually drive the kernel.

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/cli/help.rs"]
mod cli_help;

#[path = "specs/scan/run_and_show.rs"]
mod scan_run_and_show;

#[path = "specs/scan/cancel_terminal.rs"]
mod scan_cancel_terminal;

#[path = "specs/scan/invalid_rule.rs"]
mod scan_invalid_rule;
