//! # Strongbox Storage
//!
//! The two physical record stores behind the
//! [`RecordStore`](strongbox_core::RecordStore) contract:
//!
//! - [`MemoryStore`]: the per-user client-side cache. Two-level map
//!   with fine-grained locking; rows survive deletion as tombstones so
//!   deletions replicate.
//! - [`RelationalStore`]: the central PostgreSQL store. Three tables,
//!   idempotent migrations at startup, one short transaction per
//!   mutation, bounded connection pool. It is the authoritative
//!   replica and removes rows physically when a tombstone reaches it.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod memory;
mod postgres;

pub use crate::postgres::RelationalStore;
pub use memory::MemoryStore;
