// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence ports the kernel depends on but does not implement
//! (spec §4.E "the kernel sees only a repository port"). `warden-storage`
//! provides the durable, WAL-backed implementations used by the Facade
//! and tests; an external relational store is the production backend and
//! is out of scope per spec §1.

use crate::finding::{Finding, FindingId, FindingKey};
use crate::remediation::RemediationAttempt;
use crate::scan::{Scan, ScanFilter, ScanId};
use crate::snapshot::{Snapshot, SnapshotId, SnapshotScope};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("storage io error: {0}")]
    Io(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Spec §4.E. Callers relying on cross-finding consistency use the Event
/// Bus — the kernel only assumes per-call atomicity here.
#[async_trait]
pub trait FindingStorePort: Send + Sync {
    /// Merges on identity key: preserves `detectedAt`, updates
    /// `lastSeenAt`, increments `occurrenceCount` (spec §8 "idempotent
    /// upsert").
    async fn upsert(&self, finding: Finding) -> StoreResult<Finding>;
    async fn get_by_key(&self, key: &FindingKey) -> StoreResult<Option<Finding>>;
    /// Looked up by surrogate id rather than identity key — used by
    /// subscribers (e.g. an auto-remediation trigger) that only received
    /// a `FindingId` off the Event Bus.
    async fn get_by_id(&self, id: &FindingId) -> StoreResult<Option<Finding>>;
    async fn list_open(&self, system_id: &str) -> StoreResult<Vec<Finding>>;
    async fn mark_resolved(&self, id: &FindingId, by: &str) -> StoreResult<()>;
    async fn mark_false_positive(&self, id: &FindingId, by: &str) -> StoreResult<()>;
}

#[async_trait]
pub trait ScanStorePort: Send + Sync {
    async fn save(&self, scan: Scan) -> StoreResult<()>;
    async fn get(&self, id: &ScanId) -> StoreResult<Option<Scan>>;
    async fn list(&self, filter: &ScanFilter) -> StoreResult<Vec<Scan>>;
}

#[async_trait]
pub trait AttemptStorePort: Send + Sync {
    async fn save(&self, attempt: RemediationAttempt) -> StoreResult<()>;
    async fn get(&self, id: &crate::remediation::AttemptId) -> StoreResult<Option<RemediationAttempt>>;
    /// All non-terminal attempts for a finding — used to enforce
    /// "at-most-one concurrent remediation per finding" (spec §8).
    async fn open_for_finding(&self, finding_id: &FindingId) -> StoreResult<Vec<RemediationAttempt>>;
}

#[async_trait]
pub trait SnapshotStorePort: Send + Sync {
    async fn save(&self, snapshot: Snapshot) -> StoreResult<()>;
    async fn get(&self, id: &SnapshotId) -> StoreResult<Option<Snapshot>>;
    async fn expire(&self, now: chrono::DateTime<chrono::Utc>) -> StoreResult<Vec<SnapshotId>>;
    async fn pin(&self, id: &SnapshotId) -> StoreResult<()>;
    async fn unpin(&self, id: &SnapshotId) -> StoreResult<()>;
    async fn list_by_scope(&self, scope: &SnapshotScope) -> StoreResult<Vec<Snapshot>>;
}
