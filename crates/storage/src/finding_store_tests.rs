// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;
use warden_core::{RuleId, Severity, Value};

fn key() -> FindingKey {
    FindingKey::new("sys-1", RuleId::from_string("rul-cpu"), "db", "/config/x")
}

fn finding(actual: i64, now: chrono::DateTime<chrono::Utc>) -> Finding {
    let mut f = Finding::new(key(), Severity::High, now);
    f.evidence.actual = Value::Int(actual);
    f
}

#[tokio::test]
async fn upsert_new_finding_is_stored() {
    let dir = tempdir().unwrap();
    let store = WalFindingStore::open(dir.path().join("findings.wal")).unwrap();
    let now = chrono::Utc::now();
    let saved = store.upsert(finding(92, now)).await.unwrap();
    assert_eq!(saved.occurrence_count, 1);

    let fetched = store.get_by_key(&key()).await.unwrap().unwrap();
    assert_eq!(fetched.evidence.actual, Value::Int(92));
}

#[tokio::test]
async fn upsert_redetection_coalesces_and_preserves_detected_at() {
    let dir = tempdir().unwrap();
    let store = WalFindingStore::open(dir.path().join("findings.wal")).unwrap();
    let t0 = chrono::Utc::now();
    let first = store.upsert(finding(92, t0)).await.unwrap();

    let t1 = t0 + chrono::Duration::minutes(5);
    let second = store.upsert(finding(95, t1)).await.unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(second.detected_at, first.detected_at);
    assert_eq!(second.occurrence_count, 2);
    assert_eq!(second.evidence.actual, Value::Int(95));
}

#[tokio::test]
async fn mark_resolved_removes_from_list_open() {
    let dir = tempdir().unwrap();
    let store = WalFindingStore::open(dir.path().join("findings.wal")).unwrap();
    let saved = store.upsert(finding(92, chrono::Utc::now())).await.unwrap();

    assert_eq!(store.list_open("sys-1").await.unwrap().len(), 1);
    store.mark_resolved(&saved.id, "operator-1").await.unwrap();
    assert_eq!(store.list_open("sys-1").await.unwrap().len(), 0);
}

#[tokio::test]
async fn mark_false_positive_clears_remediable() {
    let dir = tempdir().unwrap();
    let store = WalFindingStore::open(dir.path().join("findings.wal")).unwrap();
    let mut seed = finding(92, chrono::Utc::now());
    seed.remediable = true;
    let saved = store.upsert(seed).await.unwrap();

    store.mark_false_positive(&saved.id, "operator-1").await.unwrap();
    let fetched = store.get_by_key(&key()).await.unwrap().unwrap();
    assert!(fetched.false_positive);
    assert!(!fetched.remediable);
}

#[tokio::test]
async fn reopening_store_replays_wal() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("findings.wal");
    {
        let store = WalFindingStore::open(&path).unwrap();
        store.upsert(finding(92, chrono::Utc::now())).await.unwrap();
    }

    let reopened = WalFindingStore::open(&path).unwrap();
    let fetched = reopened.get_by_key(&key()).await.unwrap().unwrap();
    assert_eq!(fetched.evidence.actual, Value::Int(92));
}

// Spec §8 quantified invariant: "Idempotent upsert" — re-detections of the
// same identity key coalesce into a single open finding whose
// `occurrence_count` tracks exactly how many times it was re-detected and
// whose `detected_at` never moves.
mod idempotent_upsert_prop {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn sequential_upserts_for_same_key_accumulate_occurrence_count(
            actuals in prop::collection::vec(any::<i64>(), 1..8usize)
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let dir = tempdir().unwrap();
                let store = WalFindingStore::open(dir.path().join("findings.wal")).unwrap();
                let t0 = chrono::Utc::now();
                let mut first_detected_at = None;

                for (i, actual) in actuals.iter().enumerate() {
                    let ts = t0 + chrono::Duration::minutes(i as i64);
                    let saved = store.upsert(finding(*actual, ts)).await.unwrap();
                    let expected_detected_at = *first_detected_at.get_or_insert(saved.detected_at);
                    prop_assert_eq!(saved.detected_at, expected_detected_at);
                    prop_assert_eq!(saved.occurrence_count, (i + 1) as u64);
                    prop_assert_eq!(&saved.evidence.actual, &Value::Int(*actual));
                }

                let final_state = store.get_by_key(&key()).await.unwrap().unwrap();
                prop_assert_eq!(final_state.occurrence_count, actuals.len() as u64);
                Ok(())
            })?;
        }
    }
}
