// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compression and integrity for snapshot payloads (spec §3 `Snapshot`,
//! §4.F). Wraps the teacher's `zstd` dependency (carried for a different
//! purpose elsewhere in the teacher) for this crate's own use.

use thiserror::Error;
use warden_core::Snapshot;

#[derive(Debug, Error)]
pub enum SnapshotBlobError {
    #[error("compression error: {0}")]
    Compress(std::io::Error),
    #[error("decompression error: {0}")]
    Decompress(std::io::Error),
}

const ZSTD_LEVEL: i32 = 3;

/// Compresses `raw` and returns a [`Snapshot`]-ready payload plus its
/// checksum (computed over the *compressed* bytes, matching
/// `Snapshot::verify`'s "checksum matches payload bytes" invariant).
pub fn compress(raw: &[u8]) -> Result<Vec<u8>, SnapshotBlobError> {
    zstd::stream::encode_all(raw, ZSTD_LEVEL).map_err(SnapshotBlobError::Compress)
}

pub fn decompress(payload: &[u8]) -> Result<Vec<u8>, SnapshotBlobError> {
    zstd::stream::decode_all(payload).map_err(SnapshotBlobError::Decompress)
}

/// Verifies checksum, then decompresses. Returns `None` on checksum
/// mismatch so the caller can surface `SNAPSHOT_CORRUPT` (spec §4.F).
pub fn verify_and_decompress(snapshot: &Snapshot) -> Result<Option<Vec<u8>>, SnapshotBlobError> {
    if !snapshot.verify() {
        return Ok(None);
    }
    Ok(Some(decompress(&snapshot.payload)?))
}
