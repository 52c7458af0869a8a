// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log backing the Finding/Scan/Attempt stores, ported from
//! the teacher's `Wal` type (reconstructed from its observed test
//! contract: `open`, `append`, `flush`, `next_unprocessed`,
//! `mark_processed`, `write_seq`, `processed_seq`).
//!
//! Durable persistence is an ambient concern the kernel's own port
//! implementation needs to honor the upsert/idempotency invariants of
//! spec §8, even though the *external* system of record is out of scope
//! per spec §1.
//!
//! Every line is the `{"v": <version>, "seq": <u64>, "state": {...}}`
//! envelope [`crate::migration`] documents; `open`/`next_unprocessed` run
//! each record through a [`MigrationRegistry`] before deserializing into
//! `E`, so bumping `CURRENT_WAL_VERSION` and registering a migration is
//! enough to carry an older on-disk file forward.

use crate::migration::{MigrationError, MigrationRegistry};
use serde::{de::DeserializeOwned, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The WAL envelope version this binary writes and expects after
/// migration. Bump alongside a registered [`crate::migration::Migration`]
/// when the per-record shape changes.
pub const CURRENT_WAL_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum WalError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("migration error: {0}")]
    Migration(#[from] MigrationError),
}

/// One logged record: a sequence number plus the event it carries.
#[derive(Debug, Clone, PartialEq)]
pub struct WalEntry<E> {
    pub seq: u64,
    pub event: E,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct WalLine<E> {
    v: u32,
    seq: u64,
    #[serde(rename = "state")]
    event: E,
}

/// Parses one WAL line, migrating its envelope to `CURRENT_WAL_VERSION`
/// before decoding the `state` payload as `E`.
fn migrate_and_parse<E: DeserializeOwned>(
    line: &str,
    migrations: &MigrationRegistry,
) -> Result<WalLine<E>, WalError> {
    let raw: serde_json::Value = serde_json::from_str(line)?;
    let migrated = migrations.migrate_to(raw, CURRENT_WAL_VERSION)?;
    Ok(serde_json::from_value(migrated)?)
}

/// Append-only, line-delimited JSON log with crash-safe `flush` and a
/// replay cursor (`next_unprocessed`/`mark_processed`) separate from the
/// write cursor, so a consumer can resume replay after a restart without
/// re-processing already-applied entries.
pub struct Wal<E> {
    path: PathBuf,
    file: File,
    write_seq: u64,
    processed_seq: u64,
    reader: Option<BufReader<File>>,
    migrations: MigrationRegistry,
    _marker: PhantomData<E>,
}

impl<E: Serialize + DeserializeOwned + Clone> Wal<E> {
    /// Opens (creating if absent) the WAL at `path`. `processed_seq` seeds
    /// the replay cursor — callers that already know how far they've
    /// materialized pass that value so `next_unprocessed` doesn't replay
    /// entries the caller already applied.
    pub fn open(path: impl AsRef<Path>, processed_seq: u64) -> Result<Self, WalError> {
        Self::open_with_migrations(path, processed_seq, MigrationRegistry::new())
    }

    /// Like [`Self::open`], but runs every on-disk record through a
    /// caller-supplied [`MigrationRegistry`] first — for stores that ship
    /// with registered format migrations instead of the default empty one.
    pub fn open_with_migrations(
        path: impl AsRef<Path>,
        processed_seq: u64,
        migrations: MigrationRegistry,
    ) -> Result<Self, WalError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        let mut write_seq = 0u64;
        {
            let reader = BufReader::new(File::open(&path)?);
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let parsed: WalLine<E> = migrate_and_parse(&line, &migrations)?;
                write_seq = write_seq.max(parsed.seq);
            }
        }

        Ok(Self {
            path,
            file,
            write_seq,
            processed_seq,
            reader: None,
            migrations,
            _marker: PhantomData,
        })
    }

    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    pub fn processed_seq(&self) -> u64 {
        self.processed_seq
    }

    pub fn append(&mut self, event: &E) -> Result<u64, WalError> {
        self.write_seq += 1;
        let line = WalLine {
            v: CURRENT_WAL_VERSION,
            seq: self.write_seq,
            event: event.clone(),
        };
        let mut json = serde_json::to_string(&line)?;
        json.push('\n');
        self.file.write_all(json.as_bytes())?;
        Ok(self.write_seq)
    }

    pub fn flush(&mut self) -> Result<(), WalError> {
        self.file.flush()?;
        Ok(())
    }

    /// Returns the next entry after `processed_seq`, or `None` once the
    /// replay cursor has caught up with `write_seq`. Does not advance the
    /// cursor itself — call [`Self::mark_processed`] once the caller has
    /// durably applied the entry.
    pub fn next_unprocessed(&mut self) -> Result<Option<WalEntry<E>>, WalError> {
        let reader = match self.reader {
            Some(ref mut reader) => reader,
            None => self.reader.insert(BufReader::new(File::open(&self.path)?)),
        };
        loop {
            let mut line = String::new();
            let bytes = reader.read_line(&mut line)?;
            if bytes == 0 {
                return Ok(None);
            }
            if line.trim().is_empty() {
                continue;
            }
            let parsed: WalLine<E> = migrate_and_parse(line.trim_end(), &self.migrations)?;
            if parsed.seq <= self.processed_seq {
                continue;
            }
            return Ok(Some(WalEntry {
                seq: parsed.seq,
                event: parsed.event,
            }));
        }
    }

    pub fn mark_processed(&mut self, seq: u64) {
        self.processed_seq = self.processed_seq.max(seq);
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
