// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scan Orchestrator (spec §4.D, "the heart"): admits scans under a
//! bounded concurrency + queue policy, dispatches one scanner task per
//! non-empty rule-category group, aggregates results as they complete,
//! and drives the `pending → running → {completed|failed|cancelled}`
//! state machine.

use crate::rule_engine::RuleEngine;
use crate::scanner::{ScanContext, Scanner};
use futures_util::stream::{FuturesUnordered, StreamExt};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use warden_core::{
    ConnectorPort, DiagnosticCategory, Finding, FindingStorePort, KernelError, KernelEvent, Registry,
    RuleId, Scan, ScanFilter, ScanId, ScanOptions, ScanStatus, ScanStorePort,
};
use warden_wire::EventBus;

/// Orchestrator-wide tunables (spec §6 config subset relevant to scanning).
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub max_concurrent_scans: usize,
    pub max_queued_scans: usize,
    pub scan_timeout: Duration,
    pub finding_cap: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_scans: 4,
            max_queued_scans: 16,
            scan_timeout: Duration::from_secs(3600),
            finding_cap: 100_000,
        }
    }
}

struct Inner {
    registry: RwLock<Registry>,
    scanners: HashMap<DiagnosticCategory, Arc<dyn Scanner>>,
    rule_engine: RuleEngine,
    scan_store: Arc<dyn ScanStorePort>,
    finding_store: Arc<dyn FindingStorePort>,
    connector: Arc<dyn ConnectorPort>,
    bus: Arc<dyn EventBus>,
    config: OrchestratorConfig,
    semaphore: Arc<Semaphore>,
    queued: AtomicUsize,
    cancellations: Mutex<HashMap<ScanId, CancellationToken>>,
}

#[derive(Clone)]
pub struct ScanOrchestrator {
    inner: Arc<Inner>,
}

impl ScanOrchestrator {
    pub fn new(
        registry: Registry,
        scanners: HashMap<DiagnosticCategory, Arc<dyn Scanner>>,
        scan_store: Arc<dyn ScanStorePort>,
        finding_store: Arc<dyn FindingStorePort>,
        connector: Arc<dyn ConnectorPort>,
        bus: Arc<dyn EventBus>,
        config: OrchestratorConfig,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_scans));
        Self {
            inner: Arc::new(Inner {
                registry: RwLock::new(registry),
                scanners,
                rule_engine: RuleEngine::new(),
                scan_store,
                finding_store,
                connector,
                bus,
                config,
                semaphore,
                queued: AtomicUsize::new(0),
                cancellations: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// `createScan(systemId, opts) -> scan` (spec §4.D step 1): validates
    /// opts, persists the scan as `pending`, and dispatches its execution
    /// onto a background task once a concurrency permit is available.
    /// Returns `BACKPRESSURE` when the bounded wait queue is already full.
    pub async fn create_scan(
        &self,
        system_id: impl Into<String>,
        system_version: impl Into<String>,
        opts: ScanOptions,
    ) -> Result<Scan, KernelError> {
        let system_id = system_id.into();
        let system_version = system_version.into();
        {
            let registry = self.inner.registry.read();
            for rule_id in &opts.rules {
                if registry.get(rule_id).is_none() {
                    return Err(KernelError::InvalidInput(format!("unknown rule id {rule_id}")));
                }
            }
        }

        if self.inner.semaphore.available_permits() == 0 {
            let queued_now = self.inner.queued.fetch_add(1, Ordering::SeqCst) + 1;
            if queued_now > self.inner.config.max_queued_scans {
                self.inner.queued.fetch_sub(1, Ordering::SeqCst);
                tracing::warn!(%system_id, queued_now, "scan queue full, rejecting with backpressure");
                return Err(KernelError::Backpressure(
                    "scan queue is full; retry later".into(),
                ));
            }
        }

        let now = chrono::Utc::now();
        let scan = Scan::new(&system_id, &opts, now);
        self.inner
            .scan_store
            .save(scan.clone())
            .await
            .map_err(|e| KernelError::IllegalState(e.to_string()))?;

        let cancellation = CancellationToken::new();
        self.inner
            .cancellations
            .lock()
            .insert(scan.id, cancellation.clone());

        let this = self.clone();
        let scan_id = scan.id;
        tokio::spawn(async move {
            this.run_scan(scan_id, system_version, cancellation).await;
        });

        Ok(scan)
    }

    /// `cancelScan(id)` (spec §4.D): idempotent; a terminal scan is left
    /// untouched, otherwise the scan's cancellation token is signalled and
    /// the running task observes it at its next yield point.
    pub async fn cancel_scan(&self, id: &ScanId) -> Result<(), KernelError> {
        let scan = self
            .inner
            .scan_store
            .get(id)
            .await
            .map_err(|e| KernelError::IllegalState(e.to_string()))?;
        let Some(scan) = scan else {
            return Err(KernelError::InvalidInput(format!("unknown scan id {id}")));
        };
        if scan.status.is_terminal() {
            return Ok(());
        }
        if let Some(token) = self.inner.cancellations.lock().get(id) {
            token.cancel();
        }
        Ok(())
    }

    pub async fn get_scan(&self, id: &ScanId) -> Result<Option<Scan>, KernelError> {
        self.inner
            .scan_store
            .get(id)
            .await
            .map_err(|e| KernelError::IllegalState(e.to_string()))
    }

    pub async fn list_scans(&self, filter: &ScanFilter) -> Result<Vec<Scan>, KernelError> {
        self.inner
            .scan_store
            .list(filter)
            .await
            .map_err(|e| KernelError::IllegalState(e.to_string()))
    }

    async fn run_scan(&self, scan_id: ScanId, system_version: String, cancellation: CancellationToken) {
        let _permit = self.inner.semaphore.acquire().await;
        self.inner.queued.fetch_sub(1, Ordering::SeqCst).max(0);

        let outcome = tokio::time::timeout(
            self.inner.config.scan_timeout,
            self.execute_scan(scan_id, system_version, cancellation.clone()),
        )
        .await;

        if outcome.is_err() {
            tracing::error!(%scan_id, "scan timed out");
            self.finalize(scan_id, ScanStatus::Failed, "scan timed out").await;
        }
        self.inner.cancellations.lock().remove(&scan_id);
    }

    async fn execute_scan(&self, scan_id: ScanId, system_version: String, cancellation: CancellationToken) {
        let Ok(Some(mut scan)) = self.inner.scan_store.get(&scan_id).await else {
            return;
        };
        if cancellation.is_cancelled() {
            let _ = scan.transition(ScanStatus::Cancelled, chrono::Utc::now());
            let _ = self.inner.scan_store.save(scan.clone()).await;
            self.inner
                .bus
                .publish(&scan.system_id, KernelEvent::ScanCancelled { scan_id });
            return;
        }

        let now = chrono::Utc::now();
        if scan.transition(ScanStatus::Running, now).is_err() {
            return;
        }
        let _ = self.inner.scan_store.save(scan.clone()).await;
        tracing::info!(%scan_id, system_id = %scan.system_id, "scan started");
        self.inner.bus.publish(
            &scan.system_id,
            KernelEvent::ScanStarted {
                scan_id,
                system_id: scan.system_id.clone(),
            },
        );

        let resolved: Vec<RuleId> = {
            let registry = self.inner.registry.read();
            registry
                .resolve(&scan.requested_rules, &scan.categories, &system_version)
                .into_iter()
                .map(|r| r.id)
                .collect()
        };
        let rules_by_category: HashMap<DiagnosticCategory, Vec<warden_core::DiagnosticRule>> = {
            let registry = self.inner.registry.read();
            let mut map: HashMap<DiagnosticCategory, Vec<warden_core::DiagnosticRule>> = HashMap::new();
            for id in &resolved {
                if let Some(rule) = registry.get(id) {
                    map.entry(rule.category).or_default().push(rule.clone());
                }
            }
            map
        };

        let previous_findings = self
            .inner
            .finding_store
            .list_open(&scan.system_id)
            .await
            .unwrap_or_default();

        let total_tasks = rules_by_category.len().max(1);
        let mut tasks = FuturesUnordered::new();
        for (category, rules) in rules_by_category {
            let Some(scanner) = self.inner.scanners.get(&category).cloned() else {
                continue;
            };
            let ctx = ScanContext {
                system_id: scan.system_id.clone(),
                system_version: system_version.clone(),
                component: category.to_string(),
                rules,
                previous_findings: previous_findings.clone(),
                connector: self.inner.connector.clone(),
                cancellation: cancellation.clone(),
                now: chrono::Utc::now(),
            };
            let engine_ref = &self.inner.rule_engine;
            tasks.push(async move {
                let _ = scanner.initialize().await;
                let result = scanner.scan(&ctx, engine_ref).await;
                scanner.cleanup().await;
                (scanner.id().to_string(), result)
            });
        }

        let mut by_key: HashMap<warden_core::FindingKey, (Finding, String)> = HashMap::new();
        let mut any_error = false;
        let mut any_findings = false;
        let mut completed_tasks = 0usize;

        while let Some((scanner_id, result)) = tasks.next().await {
            completed_tasks += 1;
            if !result.errors.is_empty() {
                any_error = true;
            }
            for error in &result.errors {
                match error.rule_id {
                    Some(rule_id) => {
                        tracing::warn!(%scan_id, %rule_id, scanner = %scanner_id, reason = %error.message, "rule misconfigured, disabled for this scan");
                        self.inner.bus.publish(
                            &scan.system_id,
                            KernelEvent::RuleMisconfigured {
                                scan_id,
                                rule_id,
                                reason: error.message.clone(),
                            },
                        );
                    }
                    None => {
                        tracing::warn!(%scan_id, scanner = %scanner_id, reason = %error.message, "scanner extraction error");
                    }
                }
            }
            for finding in result.findings {
                any_findings = true;
                match by_key.get(&finding.key) {
                    Some((existing, existing_scanner)) if !Self::new_wins(existing, existing_scanner, &finding, &scanner_id) => {}
                    _ => {
                        by_key.insert(finding.key.clone(), (finding, scanner_id.clone()));
                    }
                }
            }
            scan.set_progress(completed_tasks, total_tasks);
            let _ = self.inner.scan_store.save(scan.clone()).await;
            self.inner.bus.publish(
                &scan.system_id,
                KernelEvent::ScanProgress {
                    scan_id,
                    progress: scan.progress,
                    completed_tasks: completed_tasks as u32,
                    total_tasks: total_tasks as u32,
                },
            );

            if by_key.len() as u64 > self.inner.config.finding_cap {
                tracing::error!(%scan_id, cap = self.inner.config.finding_cap, "finding cap exceeded, failing scan");
                self.finalize(scan_id, ScanStatus::Failed, "finding cap exceeded").await;
                return;
            }
        }

        for (finding, _) in by_key.values() {
            if self.inner.finding_store.upsert(finding.clone()).await.is_ok() {
                scan.findings.record(finding.severity, self.category_of(&finding.key));
                self.inner.bus.publish(
                    &scan.system_id,
                    KernelEvent::FindingCreated {
                        scan_id,
                        finding_id: finding.id,
                        severity: finding.severity,
                    },
                );
                if finding.remediable {
                    if let Some(action_id) = finding.remediation_action_ids.first() {
                        self.inner.bus.publish(
                            &scan.system_id,
                            KernelEvent::RemediationAvailable {
                                finding_id: finding.id,
                                action_id: *action_id,
                            },
                        );
                    }
                }
            }
        }

        let final_status = if any_error && !any_findings && by_key.is_empty() {
            ScanStatus::Failed
        } else {
            ScanStatus::Completed
        };
        let now = chrono::Utc::now();
        let _ = scan.transition(final_status, now);
        let _ = self.inner.scan_store.save(scan.clone()).await;
        tracing::info!(%scan_id, ?final_status, findings_total = scan.findings.total, "scan finished");
        match final_status {
            ScanStatus::Completed => self.inner.bus.publish(
                &scan.system_id,
                KernelEvent::ScanCompleted {
                    scan_id,
                    findings_total: scan.findings.total,
                },
            ),
            _ => self.inner.bus.publish(
                &scan.system_id,
                KernelEvent::ScanFailed {
                    scan_id,
                    reason: "every scanner task errored without producing findings".into(),
                },
            ),
        };
    }

    /// Tie-break per spec §4.D: greater severity wins; on equal severity,
    /// the lexicographically smaller scanner id wins.
    fn new_wins(existing: &Finding, existing_scanner: &str, candidate: &Finding, candidate_scanner: &str) -> bool {
        match candidate.severity.cmp(&existing.severity) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => candidate_scanner < existing_scanner,
        }
    }

    fn category_of(&self, key: &warden_core::FindingKey) -> DiagnosticCategory {
        let registry = self.inner.registry.read();
        registry
            .get(&key.rule_id)
            .map(|r| r.category)
            .unwrap_or(DiagnosticCategory::Configuration)
    }

    async fn finalize(&self, scan_id: ScanId, status: ScanStatus, reason: &str) {
        if let Ok(Some(mut scan)) = self.inner.scan_store.get(&scan_id).await {
            let now = chrono::Utc::now();
            let _ = scan.transition(status, now);
            let _ = self.inner.scan_store.save(scan.clone()).await;
            self.inner.bus.publish(
                &scan.system_id,
                KernelEvent::ScanFailed {
                    scan_id,
                    reason: reason.to_string(),
                },
            );
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
