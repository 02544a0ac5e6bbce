//! End-to-end reconciliation scenarios over two in-memory stores.

use std::sync::Arc;
use std::time::SystemTime;
use strongbox_codec::Payload;
use strongbox_core::{CancelToken, Metadata, Record, RecordDraft, RecordStore};
use strongbox_storage::MemoryStore;
use strongbox_sync::SyncEngine;
use uuid::Uuid;

const USER: &str = "5d3f8b2a-9c1e-4d6f-8a7b-0c9d8e7f6a5b";

fn store_pair() -> (Arc<MemoryStore>, Arc<MemoryStore>) {
    let local = Arc::new(MemoryStore::new());
    let remote = Arc::new(MemoryStore::new());
    local.add_user_shard(USER);
    remote.add_user_shard(USER);
    (local, remote)
}

fn engine(local: &Arc<MemoryStore>, remote: &Arc<MemoryStore>) -> SyncEngine {
    SyncEngine::new(
        USER,
        Arc::clone(local) as Arc<dyn RecordStore>,
        Arc::clone(remote) as Arc<dyn RecordStore>,
    )
}

fn text_record(id: Uuid, body: &str, version: i64) -> Record {
    let now = SystemTime::now();
    Record::new(
        id,
        USER,
        "shared note",
        now,
        now,
        &Payload::Text { data: body.into() },
        vec![Metadata::new("origin", "integration")],
        false,
        version,
    )
    .unwrap()
}

/// Collects all non-tombstoned `(id, fingerprint, version)` triples.
fn snapshot(store: &MemoryStore) -> Vec<(Uuid, String, i64)> {
    let ctx = CancelToken::new();
    let mut rows: Vec<(Uuid, String, i64)> = store
        .list(&ctx, USER, 0, 1000)
        .unwrap()
        .into_iter()
        .filter(|r| !r.deleted)
        .map(|r| (r.id, r.fingerprint, r.version))
        .collect();
    rows.sort();
    rows
}

#[test]
fn newer_version_propagates_one_way() {
    let (local, remote) = store_pair();
    let ctx = CancelToken::new();

    let id = Uuid::new_v4();
    let v2 = text_record(id, "edited on this device", 2);
    let v1 = text_record(id, "original text", 1);
    local.update(&ctx, USER, &v2).unwrap();
    remote.update(&ctx, USER, &v1).unwrap();

    engine(&local, &remote).sync_cycle().unwrap();

    let synced = remote.get(&ctx, USER, id).unwrap();
    assert_eq!(synced.version, 2);
    assert_eq!(synced.fingerprint, v2.fingerprint);
    assert_eq!(snapshot(&local), snapshot(&remote));
}

#[test]
fn older_local_replica_is_refreshed_from_remote() {
    let (local, remote) = store_pair();
    let ctx = CancelToken::new();

    let id = Uuid::new_v4();
    local.update(&ctx, USER, &text_record(id, "stale", 1)).unwrap();
    remote.update(&ctx, USER, &text_record(id, "fresh", 3)).unwrap();

    engine(&local, &remote).sync_cycle().unwrap();

    assert_eq!(local.get(&ctx, USER, id).unwrap().version, 3);
    assert_eq!(snapshot(&local), snapshot(&remote));
}

#[test]
fn conflict_preserves_both_payloads_in_both_stores() {
    let (local, remote) = store_pair();
    let ctx = CancelToken::new();

    let id = Uuid::new_v4();
    let mine = text_record(id, "edited offline on the laptop", 2);
    let theirs = text_record(id, "edited meanwhile on the phone", 2);
    local.update(&ctx, USER, &mine).unwrap();
    remote.update(&ctx, USER, &theirs).unwrap();

    let report = engine(&local, &remote).sync_cycle().unwrap();
    assert_eq!(report.conflicts, 1);

    for store in [&local, &remote] {
        let records = store.list(&ctx, USER, 0, 100).unwrap();
        assert_eq!(records.len(), 2);

        // The first sweep's source replica keeps the original id.
        let winner = store.get(&ctx, USER, id).unwrap();
        assert_eq!(winner.fingerprint, mine.fingerprint);

        // The loser survives under a fresh id, renamed.
        let copy = records.iter().find(|r| r.id != id).unwrap();
        assert_eq!(copy.fingerprint, theirs.fingerprint);
        assert!(copy.description.starts_with("(COPY) "));
    }

    assert_eq!(snapshot(&local), snapshot(&remote));
}

#[test]
fn conflict_fanout_is_stable_on_later_cycles() {
    let (local, remote) = store_pair();
    let ctx = CancelToken::new();

    let id = Uuid::new_v4();
    local.update(&ctx, USER, &text_record(id, "a", 2)).unwrap();
    remote.update(&ctx, USER, &text_record(id, "b", 2)).unwrap();

    let engine = engine(&local, &remote);
    engine.sync_cycle().unwrap();
    let settled = snapshot(&local);

    // Further cycles are no-ops: no new copies appear.
    engine.sync_cycle().unwrap();
    engine.sync_cycle().unwrap();
    assert_eq!(snapshot(&local), settled);
    assert_eq!(snapshot(&remote), settled);
    assert_eq!(settled.len(), 2);
}

#[test]
fn stores_converge_across_page_boundaries() {
    let (local, remote) = store_pair();
    let ctx = CancelToken::new();

    // More records than one page on each side, disjoint sets.
    for i in 0..35 {
        let draft = RecordDraft::new(
            format!("local {i}"),
            &Payload::Text {
                data: format!("local body {i}"),
            },
            Vec::new(),
        )
        .unwrap();
        local.add(&ctx, USER, &draft).unwrap();
    }
    for i in 0..7 {
        let draft = RecordDraft::new(
            format!("remote {i}"),
            &Payload::Text {
                data: format!("remote body {i}"),
            },
            Vec::new(),
        )
        .unwrap();
        remote.add(&ctx, USER, &draft).unwrap();
    }

    engine(&local, &remote).sync_cycle().unwrap();

    let merged = snapshot(&local);
    assert_eq!(merged.len(), 42);
    assert_eq!(merged, snapshot(&remote));
}

#[test]
fn tombstones_replicate_between_caches() {
    let (local, remote) = store_pair();
    let ctx = CancelToken::new();

    let draft = RecordDraft::new(
        "to be deleted",
        &Payload::Auth {
            login: "alice".into(),
            password: "pw".into(),
        },
        Vec::new(),
    )
    .unwrap();
    let record = local.add(&ctx, USER, &draft).unwrap();

    let engine = engine(&local, &remote);
    engine.sync_cycle().unwrap();
    assert!(!remote.get(&ctx, USER, record.id).unwrap().deleted);

    // Delete locally; the tombstone carries a higher version so the
    // comparator lets it win on the next cycle.
    local.delete(&ctx, USER, record.id).unwrap();
    let mut tombstone = local.get(&ctx, USER, record.id).unwrap();
    tombstone.version += 1;
    local.update(&ctx, USER, &tombstone).unwrap();

    engine.sync_cycle().unwrap();

    assert!(remote.get(&ctx, USER, record.id).unwrap().deleted);
    assert_eq!(snapshot(&local), snapshot(&remote));
}

#[test]
fn payloads_survive_reconciliation_byte_for_byte() {
    let (local, remote) = store_pair();
    let ctx = CancelToken::new();

    let payload = Payload::Binary {
        name: "backup-codes".into(),
        extension: "txt".into(),
        bytes: (0..=255).collect(),
    };
    let draft = RecordDraft::new("codes", &payload, Vec::new()).unwrap();
    let record = local.add(&ctx, USER, &draft).unwrap();

    engine(&local, &remote).sync_cycle().unwrap();

    let synced = remote.get(&ctx, USER, record.id).unwrap();
    assert_eq!(synced.data, record.data);
    assert!(synced.fingerprint_is_valid());
    assert_eq!(synced.payload().unwrap(), payload);
}
