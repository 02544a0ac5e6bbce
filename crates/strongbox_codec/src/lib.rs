//! # Strongbox Codec
//!
//! Canonical binary encoding for Strongbox record payloads.
//!
//! Every payload variant encodes to deterministic CBOR: map keys are
//! written in canonical order (length-first, then bytewise), integers
//! use their shortest encoding, and indefinite-length items are
//! forbidden. Two equal logical payloads therefore always produce
//! byte-identical encodings, which is what makes content fingerprints
//! stable across devices.
//!
//! The payload type tag is *not* part of the encoded bytes; it travels
//! in the record envelope, and [`Payload::decode`] takes it as an
//! argument.
//!
//! ```
//! use strongbox_codec::{fingerprint_hex, Payload, RecordKind};
//!
//! let payload = Payload::Auth {
//!     login: "alice".into(),
//!     password: "correct horse".into(),
//! };
//! let bytes = payload.encode().unwrap();
//! let fp = fingerprint_hex(&bytes);
//!
//! let decoded = Payload::decode(RecordKind::Auth, &bytes).unwrap();
//! assert_eq!(decoded, payload);
//! assert_eq!(fp, fingerprint_hex(&decoded.encode().unwrap()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod fingerprint;
mod payload;
mod reader;
mod writer;

pub use error::{CodecError, CodecResult};
pub use fingerprint::{fingerprint_hex, fingerprint_matches};
pub use payload::{CardExpiry, Payload, RecordKind};
pub use reader::CborReader;
pub use writer::CborWriter;
