// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;
use warden_adapters::FakeConnector;
use warden_core::{ActionId, ActionKind, FindingKey, RiskLevel, RuleId, Severity};
use warden_storage::{WalAttemptStore, WalFindingStore, WalSnapshotStore};
use warden_wire::InMemoryEventBus;

struct Harness {
    engine: RemediationEngine,
    connector: Arc<FakeConnector>,
    finding_store: Arc<WalFindingStore>,
}

fn harness(dir: &std::path::Path, require_approval: bool) -> Harness {
    let attempt_store = Arc::new(WalAttemptStore::open(dir.join("attempts.wal")).unwrap());
    let finding_store = Arc::new(WalFindingStore::open(dir.join("findings.wal")).unwrap());
    let snapshot_store = Arc::new(WalSnapshotStore::open(dir.join("snaps.wal")).unwrap());
    let connector = Arc::new(FakeConnector::new());
    connector.seed_operation_result("snapshot", Value::Str("before-state".into()));
    let bus = Arc::new(InMemoryEventBus::new());
    let snapshots = Arc::new(SnapshotManager::new(snapshot_store, connector.clone(), bus.clone(), 300));
    let engine = RemediationEngine::new(
        attempt_store,
        finding_store.clone(),
        snapshots,
        connector.clone(),
        bus,
        require_approval,
    );
    Harness {
        engine,
        connector,
        finding_store,
    }
}

fn action(risk: RiskLevel, requires_approval: bool) -> RemediationAction {
    RemediationAction {
        id: ActionId::new(),
        kind: ActionKind::Automatic,
        operation: "increase-pool-size".into(),
        parameters: Default::default(),
        risk_level: risk,
        requires_approval,
        requires_downtime: false,
        estimated_duration: Duration::from_secs(1),
        can_rollback: true,
        rollback_operation: Some("restore-pool-size".into()),
        rollback_parameters: Default::default(),
        pre_conditions: vec![],
        post_conditions: vec![],
    }
}

fn finding(action_id: ActionId) -> Finding {
    let key = FindingKey::new("sys-1", RuleId::from_string("rul-pool"), "database", "/pool");
    let mut f = Finding::new(key, Severity::High, chrono::Utc::now());
    f.remediable = true;
    f.remediation_action_ids = vec![action_id];
    f
}

#[tokio::test]
async fn execute_without_approval_stays_pending_and_requests_approval() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(dir.path(), true);
    let action = action(RiskLevel::Low, false);
    let f = finding(action.id);

    let result = h
        .engine
        .execute(&f, &action, RemediationOptions::default())
        .await
        .unwrap();
    assert_eq!(result.attempt.status, AttemptStatus::Pending);
}

#[tokio::test]
async fn execute_with_approval_runs_to_completion_and_resolves_finding() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(dir.path(), false);
    let action = action(RiskLevel::Low, false);
    let f = finding(action.id);
    h.finding_store.upsert(f.clone()).await.unwrap();
    h.connector.seed_operation_result("increase-pool-size", Value::Int(200));

    let opts = RemediationOptions {
        approved_by: Some("operator-1".into()),
        executed_by: Some("operator-1".into()),
        dry_run: false,
    };
    let result = h.engine.execute(&f, &action, opts).await.unwrap();
    assert_eq!(result.attempt.status, AttemptStatus::Completed);
    assert!(result.attempt.success);

    let stored = h.finding_store.get_by_key(&f.key).await.unwrap().unwrap();
    assert!(stored.resolved);
}

#[tokio::test]
async fn dry_run_completes_without_mutating_and_without_resolving() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(dir.path(), false);
    let action = action(RiskLevel::Low, false);
    let f = finding(action.id);

    let opts = RemediationOptions {
        approved_by: Some("operator-1".into()),
        executed_by: None,
        dry_run: true,
    };
    let result = h.engine.execute(&f, &action, opts).await.unwrap();
    assert_eq!(result.attempt.status, AttemptStatus::Completed);
    assert!(result.attempt.dry_run);
    assert!(h.connector.operations_invoked().is_empty());
}

#[tokio::test]
async fn concurrent_execute_on_same_finding_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(dir.path(), false);
    let action = action(RiskLevel::Low, false);
    let f = finding(action.id);
    let _lease = h.engine.acquire_lease(f.id).unwrap();

    let opts = RemediationOptions {
        approved_by: Some("operator-1".into()),
        executed_by: None,
        dry_run: true,
    };
    let err = h.engine.execute(&f, &action, opts).await.unwrap_err();
    assert!(matches!(err, KernelError::IllegalState(_)));
}

#[tokio::test]
async fn high_risk_action_requires_approval_even_when_global_policy_is_off() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(dir.path(), false);
    let action = action(RiskLevel::High, true);
    let f = finding(action.id);

    let result = h
        .engine
        .execute(&f, &action, RemediationOptions::default())
        .await
        .unwrap();
    assert_eq!(result.attempt.status, AttemptStatus::Pending);
}

#[tokio::test]
async fn failing_post_condition_with_rollback_capable_action_rolls_back() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(dir.path(), false);
    let mut action = action(RiskLevel::Low, false);
    action.post_conditions = vec![Guard {
        field_path: "evidence.actual".into(),
        operator: warden_core::ConditionOperator::Eq,
        value: Value::Str("unreachable-expected-value".into()),
    }];
    let f = finding(action.id);
    h.connector.seed_operation_result("increase-pool-size", Value::Int(999));

    let opts = RemediationOptions {
        approved_by: Some("operator-1".into()),
        executed_by: Some("operator-1".into()),
        dry_run: false,
    };
    let result = h.engine.execute(&f, &action, opts).await.unwrap();
    assert_eq!(result.attempt.status, AttemptStatus::RolledBack);
}

#[tokio::test]
async fn validate_flags_finding_not_open_and_missing_action_mapping() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(dir.path(), false);
    let action = action(RiskLevel::Low, false);
    let mut f = finding(ActionId::new());
    f.mark_resolved("operator-1", chrono::Utc::now());

    let validation = h.engine.validate(&f, &action).await;
    assert!(!validation.is_valid());
    assert!(!validation.finding_open);
    assert!(!validation.applicable);
}
