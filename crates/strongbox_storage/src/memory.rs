//! The in-memory per-user record cache.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::SystemTime;
use strongbox_core::{
    ensure_payload_size, CancelToken, Record, RecordDraft, RecordStore, StoreError, StoreResult,
};
use uuid::Uuid;

/// One user's partition of the cache.
///
/// The shard owns its own lock, so writes for one user never contend
/// with other users. The record map is ordered by id, which gives
/// `list` a stable, non-overlapping pagination order.
#[derive(Debug, Default)]
struct UserShard {
    records: RwLock<BTreeMap<Uuid, Record>>,
}

/// The client-side record cache.
///
/// Lock hierarchy: the outer shard map is always acquired before a
/// shard's own lock, and writes to a shard only ever hold the outer
/// *read* lock. A shard must be provisioned (sign-in) before any
/// record operation for that user; operations against an
/// unprovisioned user fail with
/// [`StoreError::UserStoreMissing`].
///
/// `delete` keeps the row and sets the tombstone flag so the deletion
/// survives the next sync pass.
#[derive(Debug, Default)]
pub struct MemoryStore {
    shards: RwLock<HashMap<String, Arc<UserShard>>>,
}

impl MemoryStore {
    /// Creates an empty store with no shards.
    pub fn new() -> Self {
        Self::default()
    }

    /// Provisions a shard for a user. Driven by sign-in; idempotent,
    /// but re-provisioning replaces the existing shard.
    pub fn add_user_shard(&self, user_id: &str) {
        self.shards
            .write()
            .insert(user_id.to_string(), Arc::new(UserShard::default()));
    }

    /// Drops a user's shard and everything in it. Driven by sign-out.
    pub fn remove_user_shard(&self, user_id: &str) {
        self.shards.write().remove(user_id);
    }

    fn shard(&self, user_id: &str) -> StoreResult<Arc<UserShard>> {
        self.shards
            .read()
            .get(user_id)
            .cloned()
            .ok_or_else(|| StoreError::user_store_missing(user_id))
    }
}

impl RecordStore for MemoryStore {
    fn label(&self) -> &'static str {
        "memory"
    }

    fn list(
        &self,
        ctx: &CancelToken,
        user_id: &str,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<Record>> {
        ctx.ensure_active()?;
        let shard = self.shard(user_id)?;
        let records = shard.records.read();
        Ok(records
            .values()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn get(&self, ctx: &CancelToken, user_id: &str, record_id: Uuid) -> StoreResult<Record> {
        ctx.ensure_active()?;
        let shard = self.shard(user_id)?;
        let records = shard.records.read();
        records
            .get(&record_id)
            .cloned()
            .ok_or_else(|| StoreError::record_not_found(record_id))
    }

    fn add(&self, ctx: &CancelToken, user_id: &str, draft: &RecordDraft) -> StoreResult<Record> {
        ctx.ensure_active()?;
        ensure_payload_size(draft.data.len())?;
        let shard = self.shard(user_id)?;

        let now = SystemTime::now();
        let record = Record {
            id: Uuid::new_v4(),
            owner: user_id.to_string(),
            description: draft.description.clone(),
            kind: draft.kind,
            created: now,
            modified: now,
            data: draft.data.clone(),
            fingerprint: draft.fingerprint.clone(),
            metadata: draft.metadata.clone(),
            deleted: false,
            version: 1,
        };

        shard.records.write().insert(record.id, record.clone());
        Ok(record)
    }

    fn update(&self, ctx: &CancelToken, user_id: &str, record: &Record) -> StoreResult<Record> {
        ctx.ensure_active()?;
        let shard = self.shard(user_id)?;

        let mut stored = record.clone();
        stored.modified = SystemTime::now();
        shard.records.write().insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn delete(&self, ctx: &CancelToken, user_id: &str, record_id: Uuid) -> StoreResult<()> {
        ctx.ensure_active()?;
        let shard = self.shard(user_id)?;

        let mut records = shard.records.write();
        let record = records
            .get_mut(&record_id)
            .ok_or_else(|| StoreError::record_not_found(record_id))?;
        record.deleted = true;
        record.modified = SystemTime::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strongbox_codec::Payload;
    use strongbox_core::Metadata;

    const USER: &str = "3f1b9a54-6f5e-4f9b-8c4e-2c6d1b7a0e11";

    fn provisioned_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.add_user_shard(USER);
        store
    }

    fn text_draft(description: &str, body: &str) -> RecordDraft {
        RecordDraft::new(
            description,
            &Payload::Text { data: body.into() },
            vec![Metadata::new("origin", "test")],
        )
        .unwrap()
    }

    #[test]
    fn operations_require_a_provisioned_shard() {
        let store = MemoryStore::new();
        let ctx = CancelToken::new();

        let err = store.list(&ctx, USER, 0, 10).unwrap_err();
        assert!(matches!(err, StoreError::UserStoreMissing { .. }));

        let err = store
            .add(&ctx, USER, &text_draft("note", "body"))
            .unwrap_err();
        assert!(matches!(err, StoreError::UserStoreMissing { .. }));
    }

    #[test]
    fn add_assigns_envelope_fields() {
        let store = provisioned_store();
        let ctx = CancelToken::new();

        let record = store.add(&ctx, USER, &text_draft("note", "body")).unwrap();
        assert_eq!(record.owner, USER);
        assert_eq!(record.version, 1);
        assert!(!record.deleted);
        assert_eq!(record.created, record.modified);

        let listed = store.list(&ctx, USER, 0, 10).unwrap();
        assert_eq!(listed, vec![record]);
    }

    #[test]
    fn get_after_update_returns_the_new_payload() {
        let store = provisioned_store();
        let ctx = CancelToken::new();

        let record = store.add(&ctx, USER, &text_draft("note", "v1")).unwrap();

        let mut updated = record.clone();
        let payload = Payload::Text { data: "v2".into() };
        updated.data = payload.encode().unwrap();
        updated.fingerprint = strongbox_codec::fingerprint_hex(&updated.data);
        updated.version += 1;
        store.update(&ctx, USER, &updated).unwrap();

        let fetched = store.get(&ctx, USER, record.id).unwrap();
        assert_eq!(fetched.version, 2);
        assert_eq!(fetched.payload().unwrap(), payload);
        assert!(fetched.modified >= record.modified);
    }

    #[test]
    fn delete_keeps_a_tombstoned_row() {
        let store = provisioned_store();
        let ctx = CancelToken::new();

        let record = store.add(&ctx, USER, &text_draft("note", "body")).unwrap();
        store.delete(&ctx, USER, record.id).unwrap();

        let fetched = store.get(&ctx, USER, record.id).unwrap();
        assert!(fetched.deleted);

        // The tombstone stays visible to pagination.
        let listed = store.list(&ctx, USER, 0, 10).unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].deleted);
    }

    #[test]
    fn delete_of_unknown_record_fails() {
        let store = provisioned_store();
        let ctx = CancelToken::new();

        let err = store.delete(&ctx, USER, Uuid::new_v4()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn pagination_covers_without_duplicates() {
        let store = provisioned_store();
        let ctx = CancelToken::new();

        for i in 0..35 {
            store
                .add(&ctx, USER, &text_draft(&format!("record {i}"), "body"))
                .unwrap();
        }

        let first = store.list(&ctx, USER, 0, 30).unwrap();
        let second = store.list(&ctx, USER, 30, 30).unwrap();
        assert_eq!(first.len(), 30);
        assert_eq!(second.len(), 5);

        let mut ids: Vec<Uuid> = first.iter().chain(&second).map(|r| r.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 35);
    }

    #[test]
    fn removed_shard_forgets_records() {
        let store = provisioned_store();
        let ctx = CancelToken::new();

        store.add(&ctx, USER, &text_draft("note", "body")).unwrap();
        store.remove_user_shard(USER);

        let err = store.list(&ctx, USER, 0, 10).unwrap_err();
        assert!(matches!(err, StoreError::UserStoreMissing { .. }));
    }

    #[test]
    fn cancelled_token_short_circuits() {
        let store = provisioned_store();
        let ctx = CancelToken::new();
        ctx.cancel();

        let err = store.list(&ctx, USER, 0, 10).unwrap_err();
        assert!(matches!(err, StoreError::Cancelled));
    }

    #[test]
    fn shards_are_isolated_per_user() {
        let store = provisioned_store();
        let other = "b2a7c8d9-1111-2222-3333-444455556666";
        store.add_user_shard(other);
        let ctx = CancelToken::new();

        store.add(&ctx, USER, &text_draft("mine", "body")).unwrap();
        assert!(store.list(&ctx, other, 0, 10).unwrap().is_empty());
    }
}
