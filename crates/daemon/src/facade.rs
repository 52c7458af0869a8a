// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Kernel Facade (spec §6): single-init wiring of every component into
//! the four operations external callers use, plus `init`/`shutdown`
//! lifecycle methods (spec §9 REDESIGN FLAGS: "global live state is
//! replaced by an explicit Facade with lifecycle init → run → shutdown").

use crate::config::KernelConfig;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use warden_adapters::{DesktopNotifyAdapter, NotifyAdapter};
use warden_core::{
    ActionId, AttemptId, AttemptStorePort, ConnectorPort, DiagnosticCategory, Finding,
    FindingStorePort, KernelError, KernelEvent, Registry, RegistryError, RemediationAction,
    RemediationAttempt, RemediationOptions, RemediationResult, RollbackResult, Scan, ScanFilter,
    ScanId, ScanOptions, ValidationResult,
};
use warden_engine::orchestrator::{OrchestratorConfig, ScanOrchestrator};
use warden_engine::remediation::RemediationEngine;
use warden_engine::scanner::Scanner;
use warden_engine::snapshot_manager::SnapshotManager;
use warden_storage::{WalAttemptStore, WalFindingStore, WalScanStore, WalSnapshotStore};
use warden_wire::{EventBus, InMemoryEventBus};

#[derive(Debug, Error)]
pub enum FacadeError {
    #[error("failed to create state directory {0}: {1}")]
    StateDir(std::path::PathBuf, std::io::Error),
    #[error("failed to open durable store: {0}")]
    Wal(#[from] warden_storage::WalError),
    #[error("failed to load rule-set files: {0}")]
    Rules(#[from] warden_ruleset::FindError),
    #[error("failed to register rule: {0}")]
    Registry(#[from] RegistryError),
}

/// A bounded multiple of `max_concurrent_scans`, matching the
/// Orchestrator's own default ratio (spec §6 does not name a queue depth
/// separately from `maxConcurrentScans`).
fn queue_depth(max_concurrent_scans: usize) -> usize {
    (max_concurrent_scans * 4).max(16)
}

/// Single-init wiring of the Scan Orchestrator, Remediation Engine,
/// Snapshot Manager, durable stores, and the Event Bus (spec §6).
///
/// Generic over the notification sink the approval-requested subscriber
/// uses, the way `WalFindingStore<C: Clock>` is generic over its clock —
/// defaults to the desktop notifier, swappable in tests for a fake.
pub struct Facade<N: NotifyAdapter = DesktopNotifyAdapter> {
    orchestrator: ScanOrchestrator,
    remediation: Arc<RemediationEngine>,
    finding_store: Arc<dyn FindingStorePort>,
    attempt_store: Arc<dyn AttemptStorePort>,
    bus: Arc<dyn EventBus>,
    actions: Arc<RwLock<HashMap<ActionId, RemediationAction>>>,
    notify: N,
    config: KernelConfig,
    initialized: AtomicBool,
    background: Mutex<Option<(tokio::task::JoinHandle<()>, CancellationToken)>>,
}

impl<N: NotifyAdapter> Facade<N> {
    /// Wires every component from a loaded [`KernelConfig`], an injected
    /// [`ConnectorPort`] (the kernel has no shipped production connector
    /// per spec §1 — `warden-adapters::FakeConnector` is the reference
    /// caller), an injected scanner catalog (scanners are plugins, not
    /// kernel-owned code, matching the Connector's own "external" status),
    /// and a notification sink.
    pub fn new(
        config: KernelConfig,
        connector: Arc<dyn ConnectorPort>,
        scanners: HashMap<DiagnosticCategory, Arc<dyn Scanner>>,
        notify: N,
    ) -> Result<Self, FacadeError> {
        let state_dir = config.state_dir();
        std::fs::create_dir_all(&state_dir)
            .map_err(|e| FacadeError::StateDir(state_dir.clone(), e))?;

        let scan_store = Arc::new(WalScanStore::open(state_dir.join("scans.wal"))?);
        let finding_store: Arc<dyn FindingStorePort> =
            Arc::new(WalFindingStore::open(state_dir.join("findings.wal"))?);
        let attempt_store: Arc<dyn AttemptStorePort> =
            Arc::new(WalAttemptStore::open(state_dir.join("attempts.wal"))?);
        let snapshot_store = Arc::new(WalSnapshotStore::open(state_dir.join("snapshots.wal"))?);

        let rules_dir = state_dir.join("rules");
        std::fs::create_dir_all(&rules_dir).map_err(|e| FacadeError::StateDir(rules_dir.clone(), e))?;
        let rule_set = warden_ruleset::collect_all_rules(&rules_dir)?;

        let mut registry = Registry::new();
        let mut rules = rule_set.rules;
        rules.sort_by_key(|r| r.version);
        for rule in rules {
            registry.register(rule)?;
        }

        let mut actions = HashMap::new();
        for action in rule_set.actions {
            actions.insert(action.id, action);
        }

        let bus: Arc<dyn EventBus> = Arc::new(InMemoryEventBus::new());

        let snapshots = Arc::new(SnapshotManager::new(
            snapshot_store,
            connector.clone(),
            bus.clone(),
            config.snapshot_ttl.as_secs(),
        ));

        let orchestrator_config = OrchestratorConfig {
            max_concurrent_scans: config.max_concurrent_scans,
            max_queued_scans: queue_depth(config.max_concurrent_scans),
            scan_timeout: config.scan_timeout,
            finding_cap: config.finding_cap,
        };
        let orchestrator = ScanOrchestrator::new(
            registry,
            scanners,
            scan_store,
            finding_store.clone(),
            connector.clone(),
            bus.clone(),
            orchestrator_config,
        );

        let remediation = Arc::new(RemediationEngine::new(
            attempt_store.clone(),
            finding_store.clone(),
            snapshots,
            connector,
            bus.clone(),
            config.require_approval,
        ));

        Ok(Self {
            orchestrator,
            remediation,
            finding_store,
            attempt_store,
            bus,
            actions: Arc::new(RwLock::new(actions)),
            notify,
            config,
            initialized: AtomicBool::new(false),
            background: Mutex::new(None),
        })
    }

    /// Idempotent: repeat calls are a no-op. Starts the background
    /// subscriber that sends approval-requested notifications and, when
    /// `enable_auto_remediation` is set, auto-triggers `execute` for
    /// every `remediation:available` event (spec §6 "When false,
    /// `remediation.available` is still published but no action
    /// executes").
    pub fn init(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return;
        }
        let cancellation = CancellationToken::new();
        let subscription = self.bus.subscribe();
        let finding_store = self.finding_store.clone();
        let actions = self.actions.clone();
        let remediation = self.remediation.clone();
        let notify = self.notify.clone();
        let auto_remediate = self.config.enable_auto_remediation;
        let token = cancellation.clone();

        let handle = tokio::spawn(async move {
            loop {
                let envelope = tokio::select! {
                    _ = token.cancelled() => break,
                    envelope = subscription.recv() => envelope,
                };
                match envelope.event {
                    KernelEvent::RemediationApprovalRequested { finding_id, attempt_id } => {
                        let title = "Remediation approval requested".to_string();
                        let message = format!("finding {finding_id} attempt {attempt_id}");
                        if let Err(e) = notify.notify(&title, &message).await {
                            tracing::warn!(%finding_id, %attempt_id, error = %e, "approval notification failed");
                        }
                    }
                    KernelEvent::RemediationAvailable { finding_id, action_id } if auto_remediate => {
                        let finding = match finding_store.get_by_id(&finding_id).await {
                            Ok(Some(f)) if f.is_open() => f,
                            Ok(_) => continue,
                            Err(e) => {
                                tracing::warn!(%finding_id, error = %e, "auto-remediation lookup failed");
                                continue;
                            }
                        };
                        let action = actions.read().get(&action_id).cloned();
                        let Some(action) = action else {
                            tracing::warn!(%action_id, "auto-remediation: unknown action id");
                            continue;
                        };
                        if let Err(e) = remediation
                            .execute(&finding, &action, RemediationOptions::default())
                            .await
                        {
                            tracing::warn!(%finding_id, %action_id, error = %e, "auto-remediation execute failed");
                        }
                    }
                    _ => {}
                }
            }
        });
        *self.background.lock() = Some((handle, cancellation));
    }

    /// Cancels the background subscriber and blocks until it exits.
    pub async fn shutdown(&self) {
        let Some((handle, cancellation)) = self.background.lock().take() else {
            return;
        };
        cancellation.cancel();
        let _ = handle.await;
        self.initialized.store(false, Ordering::SeqCst);
    }

    pub async fn run_diagnostics(
        &self,
        system_id: impl Into<String>,
        system_version: impl Into<String>,
        opts: ScanOptions,
    ) -> Result<Scan, KernelError> {
        self.orchestrator.create_scan(system_id, system_version, opts).await
    }

    pub async fn cancel_scan(&self, id: &ScanId) -> Result<(), KernelError> {
        self.orchestrator.cancel_scan(id).await
    }

    pub async fn get_scan(&self, id: &ScanId) -> Result<Option<Scan>, KernelError> {
        self.orchestrator.get_scan(id).await
    }

    pub async fn list_scans(&self, filter: &ScanFilter) -> Result<Vec<Scan>, KernelError> {
        self.orchestrator.list_scans(filter).await
    }

    pub async fn list_findings(&self, system_id: &str) -> Result<Vec<Finding>, KernelError> {
        self.finding_store
            .list_open(system_id)
            .await
            .map_err(|e| KernelError::IllegalState(e.to_string()))
    }

    pub async fn get_finding(&self, id: &warden_core::FindingId) -> Result<Option<Finding>, KernelError> {
        self.finding_store
            .get_by_id(id)
            .await
            .map_err(|e| KernelError::IllegalState(e.to_string()))
    }

    pub fn action(&self, id: &ActionId) -> Option<RemediationAction> {
        self.actions.read().get(id).cloned()
    }

    pub async fn get_attempt(&self, id: &AttemptId) -> Result<Option<RemediationAttempt>, KernelError> {
        self.attempt_store
            .get(id)
            .await
            .map_err(|e| KernelError::IllegalState(e.to_string()))
    }

    pub async fn validate_remediation(&self, finding: &Finding, action: &RemediationAction) -> ValidationResult {
        self.remediation.validate(finding, action).await
    }

    /// `remediate(finding, action, opts) -> RemediationResult` (spec §6).
    pub async fn remediate(
        &self,
        finding: &Finding,
        action: &RemediationAction,
        opts: RemediationOptions,
    ) -> Result<RemediationResult, KernelError> {
        self.remediation.execute(finding, action, opts).await
    }

    pub async fn rollback(
        &self,
        attempt: &mut RemediationAttempt,
        action: &RemediationAction,
    ) -> Result<RollbackResult, KernelError> {
        self.remediation.rollback(attempt, action).await
    }

    pub fn diagnostic_engine(&self) -> &ScanOrchestrator {
        &self.orchestrator
    }

    pub fn remediation_engine(&self) -> &RemediationEngine {
        &self.remediation
    }
}

#[cfg(test)]
#[path = "facade_tests.rs"]
mod tests;
