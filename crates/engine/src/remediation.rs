// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remediation Engine (spec §4.G): validate/execute/rollback over the
//! `pending → approved → executing → {completed|failed} → (optional)
//! rolled-back` state machine, with a per-finding mutual-exclusion lease
//! and exponential-backoff retry of transient Connector errors.

use crate::backoff;
use crate::snapshot_manager::SnapshotManager;
use std::collections::HashSet;
use std::sync::Arc;
use warden_core::{
    AttemptStatus, AttemptStorePort, ChangeSet, ConnectorError, ConnectorPort, Finding,
    FindingId, FindingStorePort, Guard, KernelError, RemediationAction, RemediationAttempt,
    RemediationOptions, RemediationResult, RollbackResult, SnapshotScope, SnapshotType,
    ValidationResult, Value,
};
use warden_wire::EventBus;

/// RAII per-finding lease: refuses concurrent remediation on the same
/// finding (spec §4.G execution step 1). Released automatically on drop.
struct Lease {
    leases: Arc<parking_lot::Mutex<HashSet<FindingId>>>,
    finding_id: FindingId,
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.leases.lock().remove(&self.finding_id);
    }
}

pub struct RemediationEngine {
    attempt_store: Arc<dyn AttemptStorePort>,
    finding_store: Arc<dyn FindingStorePort>,
    snapshots: Arc<SnapshotManager>,
    connector: Arc<dyn ConnectorPort>,
    bus: Arc<dyn EventBus>,
    leases: Arc<parking_lot::Mutex<HashSet<FindingId>>>,
    /// Global policy override (spec §6 config `requireApproval`, default
    /// true): when set, it wins over `action.requires_approval`.
    global_require_approval: bool,
}

impl RemediationEngine {
    pub fn new(
        attempt_store: Arc<dyn AttemptStorePort>,
        finding_store: Arc<dyn FindingStorePort>,
        snapshots: Arc<SnapshotManager>,
        connector: Arc<dyn ConnectorPort>,
        bus: Arc<dyn EventBus>,
        global_require_approval: bool,
    ) -> Self {
        Self {
            attempt_store,
            finding_store,
            snapshots,
            connector,
            bus,
            leases: Arc::new(parking_lot::Mutex::new(HashSet::new())),
            global_require_approval,
        }
    }

    fn requires_approval(&self, action: &RemediationAction) -> bool {
        self.global_require_approval || action.requires_approval
    }

    fn acquire_lease(&self, finding_id: FindingId) -> Result<Lease, KernelError> {
        let mut leases = self.leases.lock();
        if !leases.insert(finding_id) {
            return Err(KernelError::IllegalState(format!(
                "remediation already in progress for finding {finding_id}"
            )));
        }
        drop(leases);
        Ok(Lease {
            leases: self.leases.clone(),
            finding_id,
        })
    }

    /// `validate(finding, action) -> ValidationResult` (spec §4.G).
    pub async fn validate(&self, finding: &Finding, action: &RemediationAction) -> ValidationResult {
        let mut reasons = Vec::new();
        if !finding.is_open() {
            reasons.push("finding is not open".to_string());
        }
        if !finding.remediation_action_ids.contains(&action.id) {
            reasons.push(format!("action {} is not applicable to this finding", action.id));
        }
        if let Err(e) = action.validate() {
            reasons.push(e);
        }
        let data = warden_core::map_from_paths([("evidence.actual", finding.evidence.actual.clone())]);
        let pre_conditions_met = evaluate_guards(&action.pre_conditions, &data);
        if !pre_conditions_met {
            reasons.push("one or more pre-conditions are false".to_string());
        }

        ValidationResult {
            applicable: finding.remediation_action_ids.contains(&action.id) && action.validate().is_ok(),
            finding_open: finding.is_open(),
            pre_conditions_met,
            estimated_impact: format!("{:?} risk, ~{:?}", action.risk_level, action.estimated_duration),
            reasons,
        }
    }

    /// `execute(finding, action, opts) -> RemediationResult` — the full
    /// state machine of spec §4.G.
    pub async fn execute(
        &self,
        finding: &Finding,
        action: &RemediationAction,
        opts: RemediationOptions,
    ) -> Result<RemediationResult, KernelError> {
        let _lease = self.acquire_lease(finding.id)?;
        let mut attempt = RemediationAttempt::new(finding.id, action.id);
        attempt.dry_run = opts.dry_run;

        if self.requires_approval(action) && opts.approved_by.is_none() {
            self.save(&attempt).await?;
            self.bus.publish(
                &finding.key.system_id,
                warden_core::KernelEvent::RemediationApprovalRequested {
                    finding_id: finding.id,
                    attempt_id: attempt.id,
                },
            );
            return Ok(RemediationResult { attempt });
        }

        attempt.approved_by = opts.approved_by.clone();
        attempt
            .transition(AttemptStatus::Approved)
            .map_err(|_| KernelError::IllegalState("cannot approve attempt".into()))?;
        attempt
            .transition(AttemptStatus::Executing)
            .map_err(|_| KernelError::IllegalState("cannot start executing".into()))?;
        attempt.started_at = Some(chrono::Utc::now());
        attempt.executed_by = opts.executed_by.clone();
        self.save(&attempt).await?;
        tracing::info!(finding_id = %finding.id, attempt_id = %attempt.id, action_id = %action.id, "remediation execution started");
        self.bus.publish(
            &finding.key.system_id,
            warden_core::KernelEvent::RemediationStarted {
                finding_id: finding.id,
                attempt_id: attempt.id,
            },
        );

        let data = warden_core::map_from_paths([("evidence.actual", finding.evidence.actual.clone())]);
        if !evaluate_guards(&action.pre_conditions, &data) {
            return self
                .fail(
                    &mut attempt,
                    finding,
                    KernelError::PreconditionFalse(format!("pre-conditions false for action {}", action.id)),
                )
                .await;
        }

        if opts.dry_run {
            attempt.output = Some(format!("dry run: would execute {}", action.operation));
            attempt.success = true;
            attempt
                .transition(AttemptStatus::Completed)
                .map_err(|_| KernelError::IllegalState("cannot complete dry run".into()))?;
            attempt.completed_at = Some(chrono::Utc::now());
            self.save(&attempt).await?;
            tracing::info!(finding_id = %finding.id, attempt_id = %attempt.id, "dry run completed, no snapshot taken");
            self.bus.publish(
                &finding.key.system_id,
                warden_core::KernelEvent::RemediationCompleted {
                    finding_id: finding.id,
                    attempt_id: attempt.id,
                    dry_run: true,
                },
            );
            return Ok(RemediationResult { attempt });
        }

        let scope = SnapshotScope {
            system_id: finding.key.system_id.clone(),
            component_path: finding.key.component.clone(),
            kind: SnapshotType::Configuration,
        };
        let snapshot_id = match self.snapshots.snapshot(scope).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(finding_id = %finding.id, error = %e, "pre-remediation snapshot failed");
                return self
                    .fail(&mut attempt, finding, KernelError::SnapshotMissing(e.to_string()))
                    .await;
            }
        };
        attempt.snapshot_id = Some(snapshot_id);
        self.save(&attempt).await?;

        let before = self
            .snapshots
            .restore(&snapshot_id)
            .await
            .ok()
            .and_then(|r| serde_json::from_slice::<Value>(&r.payload).ok())
            .unwrap_or(Value::Null);

        let after = match self.execute_with_retry(action).await {
            Ok(v) => v,
            Err(e) => return self.fail(&mut attempt, finding, e.into()).await,
        };
        attempt.changes_made = Some(ChangeSet {
            before,
            after: after.clone(),
        });

        let post_data = warden_core::map_from_paths([("evidence.actual", after)]);
        if !evaluate_guards(&action.post_conditions, &post_data) {
            attempt.success = true;
            attempt
                .transition(AttemptStatus::Completed)
                .map_err(|_| KernelError::IllegalState("cannot complete before rollback".into()))?;
            attempt.error = Some(format!("post-conditions false for action {}", action.id));
            self.save(&attempt).await?;
            tracing::warn!(finding_id = %finding.id, attempt_id = %attempt.id, "post-conditions false after execution");
            self.bus.publish(
                &finding.key.system_id,
                warden_core::KernelEvent::RemediationFailed {
                    finding_id: finding.id,
                    attempt_id: attempt.id,
                    reason: "post-conditions false; system left in changed state".to_string(),
                    snapshot_id: attempt.snapshot_id,
                },
            );

            if action.can_rollback {
                // A rollback failure is reported on the attempt, not masked
                // as success, but it must not hide the already-failed
                // attempt record from the caller.
                if let Err(e) = self.do_rollback(&mut attempt, action).await {
                    tracing::error!(attempt_id = %attempt.id, error = %e, "rollback after failed post-conditions did not complete");
                }
            }
            return Ok(RemediationResult { attempt });
        }

        attempt.success = true;
        attempt
            .transition(AttemptStatus::Completed)
            .map_err(|_| KernelError::IllegalState("cannot complete attempt".into()))?;
        attempt.completed_at = Some(chrono::Utc::now());
        self.save(&attempt).await?;
        self.finding_store
            .mark_resolved(&finding.id, opts.executed_by.as_deref().unwrap_or("kernel"))
            .await
            .map_err(|e| KernelError::IllegalState(e.to_string()))?;
        tracing::info!(finding_id = %finding.id, attempt_id = %attempt.id, "remediation completed and finding resolved");
        self.bus.publish(
            &finding.key.system_id,
            warden_core::KernelEvent::RemediationCompleted {
                finding_id: finding.id,
                attempt_id: attempt.id,
                dry_run: false,
            },
        );
        Ok(RemediationResult { attempt })
    }

    /// `rollback(attempt) -> RollbackResult` using the attempt's recorded
    /// snapshot id and the action's rollback operation.
    pub async fn rollback(
        &self,
        attempt: &mut RemediationAttempt,
        action: &RemediationAction,
    ) -> Result<RollbackResult, KernelError> {
        self.do_rollback(attempt, action).await?;
        Ok(RollbackResult {
            restored: attempt.status == AttemptStatus::RolledBack,
            attempt: attempt.clone(),
        })
    }

    async fn do_rollback(
        &self,
        attempt: &mut RemediationAttempt,
        action: &RemediationAction,
    ) -> Result<(), KernelError> {
        if !attempt.can_roll_back() {
            return Err(KernelError::IllegalState(
                "rollback requires a prior completed, successful attempt".into(),
            ));
        }
        let Some(rollback_op) = &action.rollback_operation else {
            return Err(KernelError::IllegalState(format!(
                "action {} has no rollback_operation",
                action.id
            )));
        };
        let snapshot_id = attempt.snapshot_id.ok_or_else(|| {
            KernelError::SnapshotMissing("attempt has no recorded snapshot".into())
        })?;

        if let Err(e) = self.snapshots.restore(&snapshot_id).await {
            attempt.error = Some(format!("rollback failed: snapshot could not be restored: {e}"));
            self.save(attempt).await?;
            tracing::error!(attempt_id = %attempt.id, error = %e, "rollback snapshot restore failed");
            return Err(KernelError::SnapshotMissing(e.to_string()));
        }

        if let Err(e) = self
            .connector
            .execute_operation(rollback_op, &action.rollback_parameters)
            .await
        {
            attempt.error = Some(format!("rollback operation failed: {e}"));
            self.save(attempt).await?;
            tracing::error!(attempt_id = %attempt.id, error = %e, "rollback connector operation failed");
            return Err(KernelError::IllegalState(e.to_string()));
        }

        attempt
            .transition(AttemptStatus::RolledBack)
            .map_err(|_| KernelError::IllegalState("cannot roll back attempt".into()))?;
        self.save(attempt).await?;
        tracing::info!(attempt_id = %attempt.id, "attempt rolled back");
        self.bus.publish(
            &attempt.finding_id.to_string(),
            warden_core::KernelEvent::RemediationRolledBack {
                finding_id: attempt.finding_id,
                attempt_id: attempt.id,
            },
        );
        Ok(())
    }

    async fn fail(
        &self,
        attempt: &mut RemediationAttempt,
        finding: &Finding,
        error: KernelError,
    ) -> Result<RemediationResult, KernelError> {
        attempt.error = Some(error.to_string());
        attempt
            .transition(AttemptStatus::Failed)
            .map_err(|_| KernelError::IllegalState("cannot fail attempt".into()))?;
        attempt.completed_at = Some(chrono::Utc::now());
        self.save(attempt).await?;
        tracing::warn!(finding_id = %finding.id, attempt_id = %attempt.id, error = %error, "remediation attempt failed");
        self.bus.publish(
            &finding.key.system_id,
            warden_core::KernelEvent::RemediationFailed {
                finding_id: finding.id,
                attempt_id: attempt.id,
                reason: error.to_string(),
                snapshot_id: attempt.snapshot_id,
            },
        );
        Ok(RemediationResult {
            attempt: attempt.clone(),
        })
    }

    async fn save(&self, attempt: &RemediationAttempt) -> Result<(), KernelError> {
        self.attempt_store
            .save(attempt.clone())
            .await
            .map_err(|e| KernelError::IllegalState(e.to_string()))
    }

    /// At most two retries with exponential backoff for transient
    /// Connector errors during execution (spec §4.G "Failure semantics").
    async fn execute_with_retry(&self, action: &RemediationAction) -> Result<Value, ConnectorError> {
        let timeout = action.execution_timeout();
        let mut attempt_no = 0;
        loop {
            let call = self
                .connector
                .execute_operation(&action.operation, &action.parameters);
            let outcome = tokio::time::timeout(timeout, call)
                .await
                .unwrap_or_else(|_| Err(ConnectorError::Transient("execution timed out".into())));
            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt_no < backoff::MAX_RETRIES => {
                    attempt_no += 1;
                    let delay = backoff::delay_for(attempt_no);
                    tracing::warn!(operation = %action.operation, attempt_no, delay_ms = delay.as_millis() as u64, error = %e, "retrying transient connector error");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Evaluates a set of guards (ANDed) against freshly extracted data,
/// reusing the same boolean semantics as rule conditions.
fn evaluate_guards(guards: &[Guard], data: &Value) -> bool {
    guards.iter().all(|guard| {
        let resolved = data.resolve_path(&guard.field_path);
        match guard.operator {
            warden_core::ConditionOperator::Exists => resolved.is_some_and(|v| !v.is_null()),
            warden_core::ConditionOperator::NotExists => resolved.is_none_or(|v| v.is_null()),
            warden_core::ConditionOperator::Eq => resolved == Some(&guard.value),
            warden_core::ConditionOperator::Ne => resolved != Some(&guard.value),
            warden_core::ConditionOperator::Gt => {
                matches!((resolved.and_then(Value::as_f64), guard.value.as_f64()), (Some(a), Some(b)) if a > b)
            }
            warden_core::ConditionOperator::Lt => {
                matches!((resolved.and_then(Value::as_f64), guard.value.as_f64()), (Some(a), Some(b)) if a < b)
            }
            warden_core::ConditionOperator::Contains => {
                resolved.map(|v| v.contains(&guard.value)).unwrap_or(false)
            }
            warden_core::ConditionOperator::Regex => false,
        }
    })
}

#[cfg(test)]
#[path = "remediation_tests.rs"]
mod tests;
