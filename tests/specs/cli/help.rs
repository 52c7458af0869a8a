//! `warden --help` describes the top-level command surface.

use crate::prelude::*;

#[test]
fn top_level_help_lists_the_three_command_groups() {
    let run = cli().args(&["--help"]).passes();
    run.stdout_has("scan").stdout_has("finding").stdout_has("remediate");
}

#[test]
fn scan_help_lists_the_scan_subcommands() {
    let run = cli().args(&["scan", "--help"]).passes();
    run.stdout_has("run").stdout_has("list").stdout_has("show").stdout_has("cancel");
}
