// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scanner framework (spec §4.C). A `Scanner` covers exactly one
//! `DiagnosticCategory`; the Orchestrator dispatches one task per scanner
//! whose category has non-empty resolved rules for a scan.

use crate::rule_engine::{EvalContext, RuleEngine};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use warden_core::{ConnectorPort, DiagnosticCategory, DiagnosticRule, Finding, FindingKey, RuleId, Value};

/// Default extraction batch size bounding scanner memory (spec §4.C).
pub const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct ScanError {
    pub rule_id: Option<RuleId>,
    pub message: String,
    pub retryable: bool,
}

impl ScanError {
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            rule_id: None,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn rule(rule_id: RuleId, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            rule_id: Some(rule_id),
            message: message.into(),
            retryable,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub findings: Vec<Finding>,
    pub errors: Vec<ScanError>,
}

/// Per-scanner-task context built by the Orchestrator from the scan's
/// resolved state.
pub struct ScanContext {
    pub system_id: String,
    pub system_version: String,
    pub component: String,
    pub rules: Vec<DiagnosticRule>,
    pub previous_findings: Vec<Finding>,
    pub connector: Arc<dyn ConnectorPort>,
    pub cancellation: CancellationToken,
    pub now: chrono::DateTime<chrono::Utc>,
}

impl ScanContext {
    /// Looks up an open previous finding by identity key, for the
    /// occurrence-count/detected-at carry-forward in spec §4.C step 4.
    pub fn previous_open(&self, key: &FindingKey) -> Option<&Finding> {
        self.previous_findings.iter().find(|f| &f.key == key && f.is_open())
    }
}

/// Splits an extraction set into fixed-size batches (spec §4.C "Batch
/// helper"), bounding a scanner's peak memory while processing large CM
/// result sets.
pub fn batches<T>(items: Vec<T>, batch_size: usize) -> Vec<Vec<T>> {
    let size = batch_size.max(1);
    let mut remaining = items;
    let mut out = Vec::new();
    while !remaining.is_empty() {
        let take = remaining.len().min(size);
        out.push(remaining.drain(..take).collect());
    }
    out
}

#[async_trait]
pub trait Scanner: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn category(&self) -> DiagnosticCategory;
    fn version(&self) -> &str;
    /// `None` means the scanner accepts any rule of its category
    /// (spec §4.C: "when the scanner whitelists").
    fn supported_rules(&self) -> Option<&HashSet<RuleId>> {
        None
    }
    fn supported_versions(&self) -> &[String];

    /// Idempotent lazy init; the default no-op suffices for scanners with
    /// no external state to warm.
    async fn initialize(&self) -> Result<(), ScanError> {
        Ok(())
    }

    async fn cleanup(&self) {}

    /// Extracts category-specific data through the Connector. Returning
    /// `Err` is fatal to the scan task only when no data at all could be
    /// produced; a scanner that can still partially extract should return
    /// `Ok` with degraded coverage and push a `ScanError` into the result
    /// it later returns from `scan`.
    async fn extract(&self, ctx: &ScanContext) -> Result<Value, ScanError>;

    /// Runs this scanner's rules against freshly extracted `data`,
    /// coalescing against `ctx.previous_findings` and respecting
    /// cancellation between rules (spec §4.C, §5 "Cancellation").
    ///
    /// `extract` may return either a single resource's data (a flat
    /// `Value::Map`, in which case `resourcePath` falls back to
    /// `ctx.component`) or a `Value::List` of per-resource maps, each
    /// carrying its own `resource_path` field — the convention scanners
    /// covering more than one resource per category (two disks, two
    /// accounts) use so distinct resources keep distinct Finding identity
    /// keys (spec §3, §4.B "resourcePath computed by scanner").
    async fn scan(&self, ctx: &ScanContext, engine: &RuleEngine) -> ScanResult {
        let mut result = ScanResult::default();
        let data = match self.extract(ctx).await {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(scanner = %self.id(), error = %err.message, "extraction failed");
                result.errors.push(err);
                return result;
            }
        };
        let resources = resources_of(&data, &ctx.component);

        'rules: for rule in &ctx.rules {
            if rule.category != self.category() {
                continue;
            }
            if let Some(whitelist) = self.supported_rules() {
                if !whitelist.contains(&rule.id) {
                    continue;
                }
            }
            let version_ok = rule
                .supported_versions
                .iter()
                .any(|pattern| warden_core::version_matches(pattern, &ctx.system_version));
            if !version_ok {
                continue;
            }

            for (resource_path, resource_data) in &resources {
                if ctx.cancellation.is_cancelled() {
                    break 'rules;
                }
                let eval_ctx = EvalContext {
                    system_id: ctx.system_id.clone(),
                    component: ctx.component.clone(),
                    resource_path: resource_path.clone(),
                };
                match engine.evaluate(rule, resource_data, &eval_ctx, ctx.now) {
                    Ok(Some(mut finding)) => {
                        if let Some(prev) = ctx.previous_open(&finding.key) {
                            let mut carried = prev.clone();
                            carried.coalesce(&finding, ctx.now);
                            finding = carried;
                        }
                        result.findings.push(finding);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(scanner = %self.id(), rule_id = %rule.id, error = %e, "rule evaluation failed");
                        result.errors.push(ScanError::rule(rule.id, e.to_string(), false));
                    }
                }
            }
        }
        result
    }
}

/// Splits extracted data into `(resourcePath, data)` pairs per the
/// single-resource/multi-resource convention documented on
/// [`Scanner::scan`].
fn resources_of<'a>(data: &'a Value, component: &str) -> Vec<(String, &'a Value)> {
    match data {
        Value::List(items) => items
            .iter()
            .map(|item| {
                let resource_path = item
                    .resolve_path("resource_path")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| component.to_string());
                (resource_path, item)
            })
            .collect(),
        other => vec![(component.to_string(), other)],
    }
}

#[cfg(test)]
#[path = "scanner_tests.rs"]
mod tests;
