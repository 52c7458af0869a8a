// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WAL-backed `FindingStorePort` implementation (spec §4.E).
//!
//! Each mutation appends the finding's full post-mutation state to the
//! WAL; materialized state is an in-memory map replayed from the WAL at
//! open time (last-write-wins per identity key, which is exactly
//! idempotent replay since each entry already *is* the merged state).

use crate::wal::Wal;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use warden_core::{
    Clock, Finding, FindingId, FindingKey, FindingStorePort, StoreError, StoreResult, SystemClock,
};

struct State {
    by_key: HashMap<FindingKey, FindingId>,
    by_id: HashMap<FindingId, Finding>,
}

pub struct WalFindingStore<C: Clock = SystemClock> {
    wal: Mutex<Wal<Finding>>,
    state: Mutex<State>,
    clock: C,
}

impl WalFindingStore<SystemClock> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, crate::wal::WalError> {
        Self::open_with_clock(path, SystemClock)
    }
}

impl<C: Clock> WalFindingStore<C> {
    pub fn open_with_clock(path: impl AsRef<Path>, clock: C) -> Result<Self, crate::wal::WalError> {
        let mut wal: Wal<Finding> = Wal::open(path, 0)?;
        let mut by_key = HashMap::new();
        let mut by_id = HashMap::new();
        while let Some(entry) = wal.next_unprocessed()? {
            by_key.insert(entry.event.key.clone(), entry.event.id);
            by_id.insert(entry.event.id, entry.event);
            wal.mark_processed(entry.seq);
        }
        Ok(Self {
            wal: Mutex::new(wal),
            state: Mutex::new(State { by_key, by_id }),
            clock,
        })
    }

    fn persist(&self, finding: &Finding) -> StoreResult<()> {
        let mut wal = self.wal.lock();
        wal.append(finding).map_err(|e| StoreError::Io(e.to_string()))?;
        wal.flush().map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl<C: Clock> FindingStorePort for WalFindingStore<C> {
    async fn upsert(&self, finding: Finding) -> StoreResult<Finding> {
        let now = chrono::DateTime::from_timestamp_millis(self.clock.epoch_ms() as i64)
            .unwrap_or_else(chrono::Utc::now);
        let merged = {
            let mut state = self.state.lock();
            match state.by_key.get(&finding.key).and_then(|id| state.by_id.get(id).cloned()) {
                Some(mut existing) if existing.is_open() => {
                    existing.coalesce(&finding, now);
                    existing
                }
                _ => finding,
            }
        };
        self.persist(&merged)?;
        let mut state = self.state.lock();
        state.by_key.insert(merged.key.clone(), merged.id);
        state.by_id.insert(merged.id, merged.clone());
        Ok(merged)
    }

    async fn get_by_key(&self, key: &FindingKey) -> StoreResult<Option<Finding>> {
        let state = self.state.lock();
        Ok(state.by_key.get(key).and_then(|id| state.by_id.get(id).cloned()))
    }

    async fn get_by_id(&self, id: &FindingId) -> StoreResult<Option<Finding>> {
        Ok(self.state.lock().by_id.get(id).cloned())
    }

    async fn list_open(&self, system_id: &str) -> StoreResult<Vec<Finding>> {
        let state = self.state.lock();
        Ok(state
            .by_id
            .values()
            .filter(|f| f.key.system_id == system_id && f.is_open())
            .cloned()
            .collect())
    }

    async fn mark_resolved(&self, id: &FindingId, by: &str) -> StoreResult<()> {
        let now = chrono::DateTime::from_timestamp_millis(self.clock.epoch_ms() as i64)
            .unwrap_or_else(chrono::Utc::now);
        let updated = {
            let mut state = self.state.lock();
            let finding = state
                .by_id
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            finding.mark_resolved(by, now);
            finding.clone()
        };
        self.persist(&updated)
    }

    async fn mark_false_positive(&self, id: &FindingId, _by: &str) -> StoreResult<()> {
        let updated = {
            let mut state = self.state.lock();
            let finding = state
                .by_id
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            finding.mark_false_positive();
            finding.clone()
        };
        self.persist(&updated)
    }
}

#[cfg(test)]
#[path = "finding_store_tests.rs"]
mod tests;
