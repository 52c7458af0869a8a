// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WAL-backed `SnapshotStorePort` implementation (spec §4.F).

use crate::wal::Wal;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use warden_core::{Snapshot, SnapshotId, SnapshotScope, SnapshotStorePort, StoreError, StoreResult};

pub struct WalSnapshotStore {
    wal: Mutex<Wal<Snapshot>>,
    state: Mutex<HashMap<SnapshotId, Snapshot>>,
}

impl WalSnapshotStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, crate::wal::WalError> {
        let mut wal: Wal<Snapshot> = Wal::open(path, 0)?;
        let mut state = HashMap::new();
        while let Some(entry) = wal.next_unprocessed()? {
            state.insert(entry.event.id, entry.event);
            wal.mark_processed(entry.seq);
        }
        Ok(Self {
            wal: Mutex::new(wal),
            state: Mutex::new(state),
        })
    }

    fn persist(&self, snapshot: &Snapshot) -> StoreResult<()> {
        let mut wal = self.wal.lock();
        wal.append(snapshot).map_err(|e| StoreError::Io(e.to_string()))?;
        wal.flush().map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStorePort for WalSnapshotStore {
    async fn save(&self, snapshot: Snapshot) -> StoreResult<()> {
        self.persist(&snapshot)?;
        self.state.lock().insert(snapshot.id, snapshot);
        Ok(())
    }

    async fn get(&self, id: &SnapshotId) -> StoreResult<Option<Snapshot>> {
        Ok(self.state.lock().get(id).cloned())
    }

    async fn expire(&self, now: DateTime<Utc>) -> StoreResult<Vec<SnapshotId>> {
        let expired: Vec<SnapshotId> = {
            let state = self.state.lock();
            state
                .values()
                .filter(|s| s.is_expired(now))
                .map(|s| s.id)
                .collect()
        };
        self.state.lock().retain(|id, _| !expired.contains(id));
        Ok(expired)
    }

    async fn pin(&self, id: &SnapshotId) -> StoreResult<()> {
        let updated = {
            let mut state = self.state.lock();
            let snapshot = state
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            snapshot.pin();
            snapshot.clone()
        };
        self.persist(&updated)
    }

    async fn unpin(&self, id: &SnapshotId) -> StoreResult<()> {
        let updated = {
            let mut state = self.state.lock();
            let snapshot = state
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            snapshot.unpin();
            snapshot.clone()
        };
        self.persist(&updated)
    }

    async fn list_by_scope(&self, scope: &SnapshotScope) -> StoreResult<Vec<Snapshot>> {
        let state = self.state.lock();
        Ok(state
            .values()
            .filter(|s| &s.scope == scope)
            .cloned()
            .collect())
    }
}
