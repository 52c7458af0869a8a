// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshots: opaque, integrity-checked captures used for remediation
//! rollback (spec §3 `Snapshot`, §4.F).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::define_id! {
    pub struct SnapshotId("snp-");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotType {
    Configuration,
    Database,
    Filesystem,
    Composite,
}

crate::simple_display! {
    SnapshotType {
        Configuration => "configuration",
        Database => "database",
        Filesystem => "filesystem",
        Composite => "composite",
    }
}

/// Declares which subset of a CM system a snapshot covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotScope {
    pub system_id: String,
    pub component_path: String,
    pub kind: SnapshotType,
}

/// An opaque, immutable capture. `payload` is never interpreted by the
/// kernel — only by the `ConnectorAdapter` that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub checksum: String,
    pub timestamp: DateTime<Utc>,
    pub scope: SnapshotScope,
    pub payload: Vec<u8>,
    pub ttl_seconds: u64,
    /// Refcount of in-flight remediation attempts pinning this snapshot
    /// against expiry (spec §5 "Shared-resource policy").
    #[serde(default)]
    pub pin_count: u32,
}

impl Snapshot {
    pub fn checksum_of(payload: &[u8]) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(payload);
        format!("{:x}", hasher.finalize())
    }

    /// Checksum verification mandatory before restore (spec §4.F);
    /// mismatch is `SNAPSHOT_CORRUPT`, fatal to the caller.
    pub fn verify(&self) -> bool {
        self.checksum == Self::checksum_of(&self.payload)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.timestamp + chrono::Duration::seconds(self.ttl_seconds as i64)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.pin_count == 0 && now >= self.expires_at()
    }

    pub fn pin(&mut self) {
        self.pin_count += 1;
    }

    pub fn unpin(&mut self) {
        self.pin_count = self.pin_count.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(payload: &[u8], ttl: u64) -> Snapshot {
        Snapshot {
            id: SnapshotId::new(),
            checksum: Snapshot::checksum_of(payload),
            timestamp: Utc::now(),
            scope: SnapshotScope {
                system_id: "sys-1".into(),
                component_path: "database".into(),
                kind: SnapshotType::Database,
            },
            payload: payload.to_vec(),
            ttl_seconds: ttl,
            pin_count: 0,
        }
    }

    #[test]
    fn verify_passes_for_matching_checksum() {
        let s = snap(b"payload-bytes", 60);
        assert!(s.verify());
    }

    #[test]
    fn verify_fails_on_tampered_payload() {
        let mut s = snap(b"payload-bytes", 60);
        s.payload = b"tampered".to_vec();
        assert!(!s.verify());
    }

    #[test]
    fn pinned_snapshot_never_expires() {
        let mut s = snap(b"x", 0);
        s.pin();
        assert!(!s.is_expired(Utc::now() + chrono::Duration::days(1)));
        s.unpin();
        assert!(s.is_expired(Utc::now() + chrono::Duration::seconds(1)));
    }
}
