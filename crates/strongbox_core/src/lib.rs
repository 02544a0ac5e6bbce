//! # Strongbox Core
//!
//! The record model and the contracts the rest of the workspace is
//! written against.
//!
//! This crate provides:
//! - [`Record`] and [`RecordDraft`], the stored entity and its
//!   creation-time projection
//! - [`compare`], the version-vector comparator that drives
//!   reconciliation
//! - [`RecordStore`] and [`UserStore`], the uniform contracts every
//!   physical store implements
//! - [`CancelToken`], cooperative cancellation observed by every store
//!   call
//! - the payload-size guard ([`MAX_PAYLOAD`])
//!
//! No I/O happens here; concrete stores live in `strongbox_storage`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cancel;
mod error;
mod limits;
mod metadata;
mod record;
mod store;
mod vector;

pub use cancel::CancelToken;
pub use error::{DirectoryError, DirectoryResult, StoreError, StoreResult};
pub use limits::{ensure_payload_size, MAX_PAYLOAD};
pub use metadata::Metadata;
pub use record::{Record, RecordDraft};
pub use store::{RecordStore, User, UserStore};
pub use vector::{compare, Dominance, VersionVector};
