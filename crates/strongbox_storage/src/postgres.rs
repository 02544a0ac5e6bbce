//! The PostgreSQL-backed central store.

use postgres::error::SqlState;
use postgres::{NoTls, Row, Transaction};
use r2d2_postgres::PostgresConnectionManager;
use std::time::SystemTime;
use strongbox_core::{
    ensure_payload_size, CancelToken, DirectoryError, DirectoryResult, Metadata, Record,
    RecordDraft, RecordStore, StoreError, StoreResult, User, UserStore,
};
use strongbox_codec::RecordKind;
use tracing::error;
use uuid::Uuid;

type PgPool = r2d2::Pool<PostgresConnectionManager<NoTls>>;
type PgConn = r2d2::PooledConnection<PostgresConnectionManager<NoTls>>;

/// Upper bound on concurrently checked-out connections.
const POOL_SIZE: u32 = 8;

const LIST_SQL: &str = "\
SELECT r.id, r.userid, r.description, r.dtype, r.created, r.modified, r.hashsum, r.version, d.data
FROM records AS r
LEFT JOIN datarecords AS d ON r.id = d.recordid
WHERE r.userid = $1
ORDER BY r.id
LIMIT $2 OFFSET $3";

const GET_SQL: &str = "\
SELECT r.id, r.userid, r.description, r.dtype, r.created, r.modified, r.hashsum, r.version, d.data
FROM records AS r
LEFT JOIN datarecords AS d ON r.id = d.recordid
WHERE r.userid = $1 AND r.id = $2";

const ADD_SQL: &str = "\
INSERT INTO records (id, userid, description, dtype, created, modified, hashsum, version)
VALUES ($1, $2, $3, $4, now(), now(), $5, 1)
ON CONFLICT (id) DO UPDATE
    SET description = EXCLUDED.description,
        modified = now(),
        hashsum = EXCLUDED.hashsum,
        version = records.version + 1
RETURNING id, userid, description, dtype, created, modified, hashsum, version";

const UPDATE_SQL: &str = "\
INSERT INTO records (id, userid, description, dtype, created, modified, hashsum, version)
VALUES ($1, $2, $3, $4, $5, now(), $6, $7)
ON CONFLICT (id) DO UPDATE
    SET description = EXCLUDED.description,
        modified = now(),
        hashsum = EXCLUDED.hashsum,
        version = EXCLUDED.version
RETURNING id, userid, description, dtype, created, modified, hashsum, version";

const DATA_UPSERT_SQL: &str = "\
INSERT INTO datarecords (recordid, data) VALUES ($1, $2)
ON CONFLICT (recordid) DO UPDATE SET data = EXCLUDED.data";

const METADATA_BATCH_SQL: &str = "\
SELECT recordid, key, value FROM metadata WHERE recordid = ANY($1)";

const MIGRATIONS_SQL: &str = "\
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY,
    login TEXT UNIQUE NOT NULL,
    pass TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS records (
    id UUID PRIMARY KEY,
    userid UUID NOT NULL REFERENCES users (id),
    description TEXT,
    dtype TEXT,
    created TIMESTAMPTZ DEFAULT now(),
    modified TIMESTAMPTZ DEFAULT now(),
    hashsum TEXT,
    version BIGINT
);
CREATE INDEX IF NOT EXISTS records_userid_idx ON records (userid);
CREATE TABLE IF NOT EXISTS datarecords (
    recordid UUID PRIMARY KEY REFERENCES records (id),
    data BYTEA
);
CREATE TABLE IF NOT EXISTS metadata (
    recordid UUID NOT NULL REFERENCES records (id),
    key TEXT,
    value TEXT
);
CREATE INDEX IF NOT EXISTS metadata_recordid_idx ON metadata (recordid);";

/// The central authoritative store.
///
/// Records span three tables (`records`, `datarecords`, `metadata`);
/// every mutation runs in a single transaction over a pooled
/// connection. A transaction that has not been committed when it goes
/// out of scope rolls back; rolling back an already-finished
/// transaction is a no-op.
///
/// Because this store is the single authoritative replica, a tombstone
/// arriving through [`update`](RecordStore::update) removes the rows
/// physically instead of being retained.
pub struct RelationalStore {
    pool: PgPool,
}

impl RelationalStore {
    /// Connects to the database, applies migrations and builds the
    /// bounded connection pool.
    pub fn connect(dsn: &str) -> StoreResult<Self> {
        let config = dsn
            .parse::<postgres::Config>()
            .map_err(|e| StoreError::transient(format!("invalid database DSN: {e}")))?;
        let manager = PostgresConnectionManager::new(config, NoTls);
        let pool = r2d2::Pool::builder()
            .max_size(POOL_SIZE)
            .build(manager)
            .map_err(|e| StoreError::transient(format!("connection pool: {e}")))?;

        let store = Self { pool };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> StoreResult<()> {
        let mut conn = self.conn()?;
        conn.batch_execute(MIGRATIONS_SQL).map_err(db_fault)?;
        Ok(())
    }

    fn conn(&self) -> StoreResult<PgConn> {
        self.pool
            .get()
            .map_err(|e| StoreError::transient(format!("checking out a connection: {e}")))
    }

    /// Replaces all metadata rows of a record inside a transaction.
    fn replace_metadata(
        tx: &mut Transaction<'_>,
        record_id: Uuid,
        metadata: &[Metadata],
    ) -> StoreResult<()> {
        tx.execute("DELETE FROM metadata WHERE recordid = $1", &[&record_id])
            .map_err(db_fault)?;
        for pair in metadata {
            tx.execute(
                "INSERT INTO metadata (recordid, key, value) VALUES ($1, $2, $3)",
                &[&record_id, &pair.key, &pair.value],
            )
            .map_err(db_fault)?;
        }
        Ok(())
    }

    /// Removes a record's rows inside a transaction. Returns whether a
    /// row existed.
    fn remove_record(
        tx: &mut Transaction<'_>,
        owner: Uuid,
        record_id: Uuid,
    ) -> StoreResult<bool> {
        let owned = tx
            .query_opt(
                "SELECT 1 FROM records WHERE userid = $1 AND id = $2",
                &[&owner, &record_id],
            )
            .map_err(db_fault)?
            .is_some();
        if !owned {
            return Ok(false);
        }

        tx.execute("DELETE FROM datarecords WHERE recordid = $1", &[&record_id])
            .map_err(db_fault)?;
        tx.execute("DELETE FROM metadata WHERE recordid = $1", &[&record_id])
            .map_err(db_fault)?;
        tx.execute(
            "DELETE FROM records WHERE userid = $1 AND id = $2",
            &[&owner, &record_id],
        )
        .map_err(db_fault)?;
        Ok(true)
    }

    fn metadata_for_page(
        tx: &mut Transaction<'_>,
        ids: &[Uuid],
    ) -> StoreResult<Vec<(Uuid, Metadata)>> {
        let ids: Vec<Uuid> = ids.to_vec();
        let rows = tx.query(METADATA_BATCH_SQL, &[&ids]).map_err(db_fault)?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let record_id: Uuid = row.get("recordid");
                let key: String = row.get("key");
                let value: String = row.get("value");
                (record_id, Metadata::new(key, value))
            })
            .collect())
    }
}

impl RecordStore for RelationalStore {
    fn label(&self) -> &'static str {
        "relational"
    }

    fn list(
        &self,
        ctx: &CancelToken,
        user_id: &str,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<Record>> {
        ctx.ensure_active()?;
        let owner = owner_uuid(user_id)?;
        let mut conn = self.conn()?;
        let mut tx = conn.transaction().map_err(db_fault)?;

        let rows = tx
            .query(LIST_SQL, &[&owner, &(limit as i64), &(offset as i64)])
            .map_err(db_fault)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(record_from_row(row)?);
        }

        let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
        if !ids.is_empty() {
            for (record_id, pair) in Self::metadata_for_page(&mut tx, &ids)? {
                if let Some(record) = records.iter_mut().find(|r| r.id == record_id) {
                    record.metadata.push(pair);
                }
            }
        }

        tx.commit().map_err(db_fault)?;
        Ok(records)
    }

    fn get(&self, ctx: &CancelToken, user_id: &str, record_id: Uuid) -> StoreResult<Record> {
        ctx.ensure_active()?;
        let owner = owner_uuid(user_id)?;
        let mut conn = self.conn()?;
        let mut tx = conn.transaction().map_err(db_fault)?;

        let row = tx
            .query_opt(GET_SQL, &[&owner, &record_id])
            .map_err(db_fault)?
            .ok_or_else(|| StoreError::record_not_found(record_id))?;

        let mut record = record_from_row(&row)?;
        for (_, pair) in Self::metadata_for_page(&mut tx, &[record.id])? {
            record.metadata.push(pair);
        }

        tx.commit().map_err(db_fault)?;
        Ok(record)
    }

    fn add(&self, ctx: &CancelToken, user_id: &str, draft: &RecordDraft) -> StoreResult<Record> {
        ctx.ensure_active()?;
        ensure_payload_size(draft.data.len())?;
        let owner = owner_uuid(user_id)?;
        let mut conn = self.conn()?;
        let mut tx = conn.transaction().map_err(db_fault)?;

        let id = Uuid::new_v4();
        let row = tx
            .query_one(
                ADD_SQL,
                &[
                    &id,
                    &owner,
                    &draft.description,
                    &draft.kind.as_str(),
                    &draft.fingerprint,
                ],
            )
            .map_err(db_fault)?;
        let mut record = record_from_row(&row)?;

        tx.execute(DATA_UPSERT_SQL, &[&record.id, &draft.data])
            .map_err(db_fault)?;
        Self::replace_metadata(&mut tx, record.id, &draft.metadata)?;

        tx.commit().map_err(db_fault)?;

        record.data = draft.data.clone();
        record.metadata = draft.metadata.clone();
        Ok(record)
    }

    fn update(&self, ctx: &CancelToken, user_id: &str, record: &Record) -> StoreResult<Record> {
        ctx.ensure_active()?;
        ensure_payload_size(record.data.len())?;
        let owner = owner_uuid(user_id)?;
        let mut conn = self.conn()?;
        let mut tx = conn.transaction().map_err(db_fault)?;

        // A replicated tombstone removes the rows here: this store is
        // the authoritative replica, so the tombstone has been observed
        // once it arrives.
        if record.deleted {
            Self::remove_record(&mut tx, owner, record.id)?;
            tx.commit().map_err(db_fault)?;
            let mut removed = record.clone();
            removed.modified = SystemTime::now();
            return Ok(removed);
        }

        let row = tx
            .query_one(
                UPDATE_SQL,
                &[
                    &record.id,
                    &owner,
                    &record.description,
                    &record.kind.as_str(),
                    &record.created,
                    &record.fingerprint,
                    &record.version,
                ],
            )
            .map_err(db_fault)?;
        let mut stored = record_from_row(&row)?;

        tx.execute(DATA_UPSERT_SQL, &[&stored.id, &record.data])
            .map_err(db_fault)?;
        Self::replace_metadata(&mut tx, stored.id, &record.metadata)?;

        tx.commit().map_err(db_fault)?;

        stored.data = record.data.clone();
        stored.metadata = record.metadata.clone();
        Ok(stored)
    }

    fn delete(&self, ctx: &CancelToken, user_id: &str, record_id: Uuid) -> StoreResult<()> {
        ctx.ensure_active()?;
        let owner = owner_uuid(user_id)?;
        let mut conn = self.conn()?;
        let mut tx = conn.transaction().map_err(db_fault)?;

        let existed = Self::remove_record(&mut tx, owner, record_id)?;
        if !existed {
            return Err(StoreError::record_not_found(record_id));
        }

        tx.commit().map_err(db_fault)?;
        Ok(())
    }
}

impl UserStore for RelationalStore {
    fn add_user(
        &self,
        ctx: &CancelToken,
        login: &str,
        password_hash: &str,
    ) -> DirectoryResult<User> {
        if ctx.is_cancelled() {
            return Err(DirectoryError::transient("operation cancelled"));
        }
        let mut conn = self
            .conn()
            .map_err(|e| DirectoryError::transient(e.to_string()))?;

        let id = Uuid::new_v4();
        let row = conn
            .query_one(
                "INSERT INTO users (id, login, pass) VALUES ($1, $2, $3) \
                 RETURNING id, login, pass",
                &[&id, &login, &password_hash],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DirectoryError::LoginTaken
                } else {
                    error!(error = %e, "adding a user failed");
                    DirectoryError::transient(e.to_string())
                }
            })?;

        Ok(user_from_row(&row))
    }

    fn user_by_login(&self, ctx: &CancelToken, login: &str) -> DirectoryResult<Option<User>> {
        if ctx.is_cancelled() {
            return Err(DirectoryError::transient("operation cancelled"));
        }
        let mut conn = self
            .conn()
            .map_err(|e| DirectoryError::transient(e.to_string()))?;

        let row = conn
            .query_opt(
                "SELECT id, login, pass FROM users WHERE login = $1",
                &[&login],
            )
            .map_err(|e| DirectoryError::transient(e.to_string()))?;

        Ok(row.map(|row| user_from_row(&row)))
    }
}

/// A user id that is not a UUID cannot own rows in this schema.
fn owner_uuid(user_id: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(user_id).map_err(|_| StoreError::user_store_missing(user_id))
}

fn db_fault(e: postgres::Error) -> StoreError {
    error!(error = %e, "database fault");
    StoreError::transient(e.to_string())
}

fn is_unique_violation(e: &postgres::Error) -> bool {
    e.code() == Some(&SqlState::UNIQUE_VIOLATION)
}

fn user_from_row(row: &Row) -> User {
    let id: Uuid = row.get("id");
    User {
        id,
        login: row.get("login"),
        password_hash: row.get("pass"),
    }
}

/// Builds a record from a row of the shared column set. `data` is
/// present only on joined queries; mutation paths fill it from their
/// inputs.
fn record_from_row(row: &Row) -> StoreResult<Record> {
    let kind_tag: String = row.get("dtype");
    let kind = RecordKind::from_tag(&kind_tag)?;
    let owner: Uuid = row.get("userid");
    let data: Vec<u8> = row
        .try_get::<_, Option<Vec<u8>>>("data")
        .unwrap_or(None)
        .unwrap_or_default();

    Ok(Record {
        id: row.get("id"),
        owner: owner.to_string(),
        description: row.get("description"),
        kind,
        created: row.get("created"),
        modified: row.get("modified"),
        data,
        fingerprint: row.get("hashsum"),
        metadata: Vec::new(),
        deleted: false,
        version: row.get("version"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use strongbox_codec::Payload;

    /// These tests need a live database; run them with
    /// `DATABASE_DSN=postgres://... cargo test -- --ignored`.
    fn live_store() -> RelationalStore {
        let dsn = std::env::var("DATABASE_DSN").expect("DATABASE_DSN must be set");
        RelationalStore::connect(&dsn).expect("connecting to the test database")
    }

    fn registered_user(store: &RelationalStore) -> String {
        let ctx = CancelToken::new();
        let login = format!("it-{}", Uuid::new_v4());
        store
            .add_user(&ctx, &login, "not-a-real-hash")
            .expect("registering a test user")
            .id
            .to_string()
    }

    #[test]
    #[ignore = "requires a PostgreSQL instance via DATABASE_DSN"]
    fn add_get_update_delete_roundtrip() {
        let store = live_store();
        let ctx = CancelToken::new();
        let user = registered_user(&store);

        let draft = RecordDraft::new(
            "integration record",
            &Payload::Text {
                data: "hello".into(),
            },
            vec![Metadata::new("suite", "postgres")],
        )
        .unwrap();

        let record = store.add(&ctx, &user, &draft).unwrap();
        assert_eq!(record.version, 1);

        let fetched = store.get(&ctx, &user, record.id).unwrap();
        assert_eq!(fetched.data, record.data);
        assert_eq!(fetched.fingerprint, record.fingerprint);
        assert_eq!(fetched.metadata, draft.metadata);

        let mut updated = fetched.clone();
        updated.version += 1;
        updated.description = "renamed".into();
        let stored = store.update(&ctx, &user, &updated).unwrap();
        assert_eq!(stored.version, 2);

        store.delete(&ctx, &user, record.id).unwrap();
        let err = store.get(&ctx, &user, record.id).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    #[ignore = "requires a PostgreSQL instance via DATABASE_DSN"]
    fn duplicate_login_maps_to_login_taken() {
        let store = live_store();
        let ctx = CancelToken::new();
        let login = format!("it-{}", Uuid::new_v4());

        store.add_user(&ctx, &login, "hash-one").unwrap();
        let err = store.add_user(&ctx, &login, "hash-two").unwrap_err();
        assert!(matches!(err, DirectoryError::LoginTaken));
    }

    #[test]
    fn malformed_user_id_maps_to_missing_store() {
        let err = owner_uuid("not-a-uuid").unwrap_err();
        assert!(matches!(err, StoreError::UserStoreMissing { .. }));
    }
}
