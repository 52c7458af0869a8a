// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WAL-backed `ScanStorePort` implementation.

use crate::wal::Wal;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use warden_core::{Scan, ScanFilter, ScanId, ScanStorePort, StoreResult};

pub struct WalScanStore {
    wal: Mutex<Wal<Scan>>,
    state: Mutex<HashMap<ScanId, Scan>>,
}

impl WalScanStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, crate::wal::WalError> {
        let mut wal: Wal<Scan> = Wal::open(path, 0)?;
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
impl ScanStorePort for WalScanStore {
    async fn save(&self, scan: Scan) -> StoreResult<()> {
        {
            let mut wal = self.wal.lock();
            wal.append(&scan)
                .map_err(|e| warden_core::StoreError::Io(e.to_string()))?;
            wal.flush()
                .map_err(|e| warden_core::StoreError::Io(e.to_string()))?;
        }
        self.state.lock().insert(scan.id, scan);
        Ok(())
    }

    async fn get(&self, id: &ScanId) -> StoreResult<Option<Scan>> {
        Ok(self.state.lock().get(id).cloned())
    }

    async fn list(&self, filter: &ScanFilter) -> StoreResult<Vec<Scan>> {
        let state = self.state.lock();
        Ok(state
            .values()
            .filter(|s| {
                filter
                    .system_id
                    .as_ref()
                    .map(|sid| &s.system_id == sid)
                    .unwrap_or(true)
                    && filter.status.map(|st| s.status == st).unwrap_or(true)
            })
            .cloned()
            .collect())
    }
}
