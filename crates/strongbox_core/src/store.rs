//! Store contracts.

use crate::cancel::CancelToken;
use crate::error::{DirectoryResult, StoreResult};
use crate::record::{Record, RecordDraft};
use uuid::Uuid;

/// The uniform record-store contract.
///
/// Both physical stores (the in-memory per-user cache and the
/// relational central store) and the remote client implement this
/// surface, so the sync engine is written once against it. Every
/// operation is scoped by `user_id`, which arrives verbatim from the
/// request metadata.
///
/// Pagination: `offset`/`limit` walks must cover the user's records
/// without duplicates as long as no write intervenes; with concurrent
/// writes, only the no-duplication guarantee within one walk remains.
pub trait RecordStore: Send + Sync {
    /// A short name identifying the store in diagnostics.
    fn label(&self) -> &'static str;

    /// Returns one page of the user's records, tombstones included.
    fn list(
        &self,
        ctx: &CancelToken,
        user_id: &str,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<Record>>;

    /// Returns one record by id.
    fn get(&self, ctx: &CancelToken, user_id: &str, record_id: Uuid) -> StoreResult<Record>;

    /// Stores a new record, assigning id, created, modified and
    /// version 1.
    fn add(&self, ctx: &CancelToken, user_id: &str, draft: &RecordDraft) -> StoreResult<Record>;

    /// Writes a record under its existing id, refreshing `modified`.
    ///
    /// The version is taken from the caller. Absent records are
    /// created; this is what replication uses to copy records between
    /// stores.
    fn update(&self, ctx: &CancelToken, user_id: &str, record: &Record) -> StoreResult<Record>;

    /// Deletes a record.
    ///
    /// Implementations either retain a tombstoned row or remove the
    /// row physically, per their replication role.
    fn delete(&self, ctx: &CancelToken, user_id: &str, record_id: Uuid) -> StoreResult<()>;
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// The user's id.
    pub id: Uuid,
    /// Unique login.
    pub login: String,
    /// Output of the adaptive password hash; never the password.
    pub password_hash: String,
}

/// Persistence contract for the credential directory.
///
/// Implementations store hashes only; hashing and verification live in
/// the directory on top of this trait.
pub trait UserStore: Send + Sync {
    /// Inserts a new user row, failing with
    /// [`DirectoryError::LoginTaken`](crate::DirectoryError::LoginTaken)
    /// on a duplicate login.
    fn add_user(
        &self,
        ctx: &CancelToken,
        login: &str,
        password_hash: &str,
    ) -> DirectoryResult<User>;

    /// Looks a user up by login.
    fn user_by_login(&self, ctx: &CancelToken, login: &str) -> DirectoryResult<Option<User>>;
}
