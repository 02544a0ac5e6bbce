//! # Strongbox Sync
//!
//! The reconciliation engine that keeps two record stores convergent,
//! and the remote-store client it reconciles against.
//!
//! A [`SyncEngine`] owns one signed-in user's background loop: every
//! tick it runs one *cycle*, i.e. a sweep from the local store into
//! the remote one followed by a sweep in the opposite direction. Each
//! sweep walks the source in fixed-size pages and classifies every
//! record pair with the version-vector comparator; conflicts are
//! preserved by renaming the losing replica under a fresh id.
//!
//! A store error aborts the cycle and is reported, never retried
//! within the cycle; the next tick starts over from offset zero, so a
//! persistent failure shows up as a sequence of per-tick errors and
//! cannot corrupt either store.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod engine;
mod error;
mod remote;

pub use engine::{
    CycleReport, SyncEngine, SyncStats, DEFAULT_FIRST_SYNC_DEADLINE, DEFAULT_PAGE_SIZE,
    DEFAULT_TICK,
};
pub use error::{SyncError, SyncResult};
pub use remote::RemoteStore;
