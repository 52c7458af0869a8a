// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WAL-backed `AttemptStorePort` implementation.
//!
//! `open_for_finding` backs the "at-most-one non-terminal remediation
//! attempt per finding" invariant (spec §8): callers query it before
//! admitting a new attempt.

use crate::wal::Wal;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use warden_core::{AttemptId, AttemptStorePort, FindingId, RemediationAttempt, StoreError, StoreResult};

pub struct WalAttemptStore {
    wal: Mutex<Wal<RemediationAttempt>>,
    state: Mutex<HashMap<AttemptId, RemediationAttempt>>,
}

impl WalAttemptStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, crate::wal::WalError> {
        let mut wal: Wal<RemediationAttempt> = Wal::open(path, 0)?;
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
}

#[async_trait]
impl AttemptStorePort for WalAttemptStore {
    async fn save(&self, attempt: RemediationAttempt) -> StoreResult<()> {
        {
            let mut wal = self.wal.lock();
            wal.append(&attempt).map_err(|e| StoreError::Io(e.to_string()))?;
            wal.flush().map_err(|e| StoreError::Io(e.to_string()))?;
        }
        self.state.lock().insert(attempt.id, attempt);
        Ok(())
    }

    async fn get(&self, id: &AttemptId) -> StoreResult<Option<RemediationAttempt>> {
        Ok(self.state.lock().get(id).cloned())
    }

    async fn open_for_finding(&self, finding_id: &FindingId) -> StoreResult<Vec<RemediationAttempt>> {
        let state = self.state.lock();
        Ok(state
            .values()
            .filter(|a| &a.finding_id == finding_id && !a.status.is_terminal())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use warden_core::{ActionId, AttemptStatus};

    #[tokio::test]
    async fn save_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let store = WalAttemptStore::open(dir.path().join("attempts.wal")).unwrap();
        let attempt = RemediationAttempt::new(FindingId::new(), ActionId::new());
        let id = attempt.id;
        store.save(attempt).await.unwrap();

        let fetched = store.get(&id).await.unwrap().unwrap();
        assert_eq!(fetched.id, id);
    }

    #[tokio::test]
    async fn open_for_finding_excludes_terminal_attempts() {
        let dir = tempdir().unwrap();
        let store = WalAttemptStore::open(dir.path().join("attempts.wal")).unwrap();
        let finding_id = FindingId::new();

        let mut terminal = RemediationAttempt::new(finding_id, ActionId::new());
        terminal.transition(AttemptStatus::Approved).unwrap();
        terminal.transition(AttemptStatus::Executing).unwrap();
        terminal.transition(AttemptStatus::Completed).unwrap();
        store.save(terminal).await.unwrap();

        let pending = RemediationAttempt::new(finding_id, ActionId::new());
        let pending_id = pending.id;
        store.save(pending).await.unwrap();

        let open = store.open_for_finding(&finding_id).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, pending_id);
    }

    #[tokio::test]
    async fn reopening_store_replays_wal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("attempts.wal");
        let finding_id = FindingId::new();
        {
            let store = WalAttemptStore::open(&path).unwrap();
            store
                .save(RemediationAttempt::new(finding_id, ActionId::new()))
                .await
                .unwrap();
        }

        let reopened = WalAttemptStore::open(&path).unwrap();
        assert_eq!(reopened.open_for_finding(&finding_id).await.unwrap().len(), 1);
    }
}
