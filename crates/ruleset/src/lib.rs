// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Rule-set file loading: parses externally-authored HCL (and TOML/JSON)
//! rule-set files into [`warden_core::DiagnosticRule`] and
//! [`warden_core::RemediationAction`] values.
//!
//! A rule-set file is a declarative bundle of `rule` and `action` blocks.
//! Loading validates structurally (spec §3 invariants, via
//! [`warden_core::DiagnosticRule::validate`] /
//! [`warden_core::RemediationAction::validate`]) and, for every action's
//! `operation`/`rollback_operation` string, lexically and semantically via
//! `warden-cmdguard` — a malformed or disallowed remediation command is
//! rejected at load time, long before a scan ever resolves the rule.

mod find;
mod loader;

pub use find::{collect_all_rules, find_rule_files, FindError};
pub use loader::{parse_rule_set, parse_rule_set_with_format, Format, LoadError, RuleSet};
