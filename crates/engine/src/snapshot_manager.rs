// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot Manager (spec §4.F): opaque capture/restore/expire over a
//! `SnapshotStorePort`, with payload compression and checksum integrity
//! delegated to `warden_storage::snapshot_blob`.

use std::sync::Arc;
use thiserror::Error;
use warden_core::{
    ConnectorPort, KernelEvent, Snapshot, SnapshotId, SnapshotScope, SnapshotStorePort, StoreError,
};
use warden_storage::{verify_and_decompress, SnapshotBlobError};
use warden_wire::EventBus;

#[derive(Debug, Error)]
pub enum SnapshotManagerError {
    #[error("snapshot store error: {0}")]
    Store(#[from] StoreError),
    #[error("snapshot blob error: {0}")]
    Blob(#[from] SnapshotBlobError),
    #[error("snapshot corrupt: checksum does not match payload")]
    Corrupt,
    #[error("snapshot missing: {0}")]
    Missing(SnapshotId),
}

pub struct RestoreResult {
    pub snapshot_id: SnapshotId,
    pub payload: Vec<u8>,
}

pub struct SnapshotManager {
    store: Arc<dyn SnapshotStorePort>,
    connector: Arc<dyn ConnectorPort>,
    bus: Arc<dyn EventBus>,
    default_ttl_seconds: u64,
}

impl SnapshotManager {
    pub fn new(
        store: Arc<dyn SnapshotStorePort>,
        connector: Arc<dyn ConnectorPort>,
        bus: Arc<dyn EventBus>,
        default_ttl_seconds: u64,
    ) -> Self {
        Self {
            store,
            connector,
            bus,
            default_ttl_seconds,
        }
    }

    /// Captures an opaque state snapshot scoped to `scope` via the
    /// Connector's `execute_operation("snapshot", ...)` convention, then
    /// compresses and checksums the payload before persisting it.
    pub async fn snapshot(&self, scope: SnapshotScope) -> Result<SnapshotId, SnapshotManagerError> {
        let mut params = std::collections::BTreeMap::new();
        params.insert("component_path".to_string(), warden_core::Value::Str(scope.component_path.clone()));
        let system_id = scope.system_id.clone();
        let observed = self
            .connector
            .execute_operation("snapshot", &params)
            .await
            .map_err(|e| SnapshotManagerError::Store(StoreError::Io(e.to_string())))?;
        let raw = serde_json::to_vec(&observed).map_err(|e| SnapshotManagerError::Store(StoreError::Io(e.to_string())))?;
        let compressed = warden_storage::compress(&raw)?;
        let checksum = Snapshot::checksum_of(&compressed);
        let id = SnapshotId::new();
        let snapshot = Snapshot {
            id,
            checksum,
            timestamp: chrono::Utc::now(),
            scope,
            payload: compressed,
            ttl_seconds: self.default_ttl_seconds,
            pin_count: 0,
        };
        self.store.save(snapshot).await?;
        tracing::info!(%id, %system_id, "snapshot captured");
        self.bus
            .publish(&system_id, KernelEvent::SnapshotCreated { snapshot_id: id });
        Ok(id)
    }

    /// Verifies integrity, then decompresses. Idempotent: repeated calls
    /// with the same snapshot id return the same bytes (spec §4.F
    /// "restore must be idempotent").
    pub async fn restore(&self, id: &SnapshotId) -> Result<RestoreResult, SnapshotManagerError> {
        let snapshot = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| SnapshotManagerError::Missing(*id))?;
        let system_id = snapshot.scope.system_id.clone();
        let payload = match verify_and_decompress(&snapshot)? {
            Some(payload) => payload,
            None => {
                tracing::warn!(%id, %system_id, "snapshot checksum mismatch");
                self.bus
                    .publish(&system_id, KernelEvent::SnapshotCorrupt { snapshot_id: *id });
                return Err(SnapshotManagerError::Corrupt);
            }
        };
        self.bus
            .publish(&system_id, KernelEvent::SnapshotRestored { snapshot_id: *id });
        Ok(RestoreResult {
            snapshot_id: *id,
            payload,
        })
    }

    pub async fn pin(&self, id: &SnapshotId) -> Result<(), SnapshotManagerError> {
        self.store.pin(id).await.map_err(Into::into)
    }

    pub async fn unpin(&self, id: &SnapshotId) -> Result<(), SnapshotManagerError> {
        self.store.unpin(id).await.map_err(Into::into)
    }

    /// Removes snapshots past TTL unless pinned by an in-flight
    /// remediation (spec §4.F, §5 "Shared-resource policy").
    pub async fn expire(&self, now: chrono::DateTime<chrono::Utc>) -> Result<Vec<SnapshotId>, SnapshotManagerError> {
        let expired = self.store.expire(now).await?;
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "snapshots expired");
        }
        Ok(expired)
    }
}

#[cfg(test)]
#[path = "snapshot_manager_tests.rs"]
mod tests;
