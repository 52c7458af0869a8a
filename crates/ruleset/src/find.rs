// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rule-set file discovery: recursively walk a directory of `.hcl` /
//! `.toml` / `.json` rule-set files and merge every `rule`/`action` block
//! found into one bundle.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::loader::{parse_rule_set_with_format, Format, RuleSet};

#[derive(Debug, Error)]
pub enum FindError {
    #[error("{0} rule-set file(s) failed to load:\n{1}")]
    LoadErrors(usize, String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Recursively collect all rule-set files (`.hcl`, `.toml`, `.json`) under
/// `dir`, in a stable (sorted) order.
pub fn find_rule_files(dir: &Path) -> Result<Vec<(PathBuf, Format)>, std::io::Error> {
    let mut files = Vec::new();
    if !dir.exists() {
        return Ok(files);
    }
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in std::fs::read_dir(&current)?.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if let Some(format) = format_for_path(&path) {
                files.push((path, format));
            }
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

fn format_for_path(path: &Path) -> Option<Format> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("hcl") => Some(Format::Hcl),
        Some("toml") => Some(Format::Toml),
        Some("json") => Some(Format::Json),
        _ => None,
    }
}

/// Scan `dir` recursively and merge every rule-set file's rules and
/// actions into one [`RuleSet`].
///
/// Files that fail to load are collected and reported together rather
/// than aborting on the first bad file, so a rule-set author sees every
/// problem in one pass.
pub fn collect_all_rules(dir: &Path) -> Result<RuleSet, FindError> {
    let files = find_rule_files(dir)?;
    let mut merged = RuleSet::default();
    let mut failures = Vec::new();

    for (path, format) in files {
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable rule-set file");
                failures.push((path, e.to_string()));
                continue;
            }
        };
        match parse_rule_set_with_format(&content, format) {
            Ok(rule_set) => {
                merged.rules.extend(rule_set.rules);
                merged.actions.extend(rule_set.actions);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping invalid rule-set file");
                failures.push((path, e.to_string()));
            }
        }
    }

    if !failures.is_empty() {
        let details = failures
            .iter()
            .map(|(p, e)| format!("  {}: {e}", p.display()))
            .collect::<Vec<_>>()
            .join("\n");
        return Err(FindError::LoadErrors(failures.len(), details));
    }

    merged.rules.sort_by(|a, b| a.id.to_string().cmp(&b.id.to_string()));
    merged.actions.sort_by(|a, b| a.id.to_string().cmp(&b.id.to_string()));
    Ok(merged)
}

#[cfg(test)]
#[path = "find_tests.rs"]
mod tests;
