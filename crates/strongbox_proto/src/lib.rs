//! # Strongbox Proto
//!
//! The transport surface between client and server: typed messages
//! for the identity and record operations, per-call metadata (the
//! `userid` key), status codes, and canonical CBOR framing.
//!
//! This is a pure protocol crate with no I/O. The [`Transport`] trait
//! is the seam a network layer implements; the server crate ships an
//! in-process loopback implementation, and the sync crate's
//! `RemoteStore` is written against the trait.
//!
//! Records travel in variant form: the payload crosses the wire as its
//! decoded fields, and the receiving side re-encodes it through the
//! canonical codec before persisting, so stored bytes are canonical on
//! both ends regardless of the sender.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod messages;
mod meta;
mod status;
mod transport;
mod wire;

pub use messages::{
    AddRecordRequest, AuthRequest, DeleteRecordRequest, GetRecordRequest, ListRecordsRequest,
    Request, Response, UpdateRecordRequest,
};
pub use meta::{CallMeta, USER_ID_KEY};
pub use status::{ServiceError, ServiceResult, StatusCode};
pub use transport::Transport;
pub use wire::{millis_to_system_time, system_time_to_millis, WireRecord};
