//! # Strongbox Server
//!
//! The server side of the transport surface: request handlers over any
//! [`RecordStore`](strongbox_core::RecordStore), the credential
//! directory with its adaptive password hashing, environment
//! configuration, and an in-process loopback transport.
//!
//! The network listener itself is deliberately absent; a transport
//! layer frames [`Request`](strongbox_proto::Request) values (one RPC
//! method per store operation) and hands them to
//! [`Server::handle`]. [`LoopbackTransport`] does exactly that
//! in-process, bytes and all, which is how the end-to-end scenarios
//! run without a socket.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod directory;
mod loopback;
mod service;

pub use config::{ConfigError, ServerConfig, DEFAULT_ADDRESS};
pub use directory::{Directory, HASH_COST};
pub use loopback::LoopbackTransport;
pub use service::{RecordsService, Server, UsersService};
