//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding or decoding payloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The record type tag is not one of the four known variants.
    #[error("unknown record type tag: {tag}")]
    UnknownKind {
        /// The tag that failed to resolve.
        tag: String,
    },

    /// The payload bytes do not decode as the claimed variant.
    #[error("invalid payload: {message}")]
    InvalidPayload {
        /// Description of the structural problem.
        message: String,
    },

    /// Input ended in the middle of an item.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// A text item is not valid UTF-8.
    #[error("invalid UTF-8 text")]
    InvalidUtf8,

    /// The bytes violate a canonical-encoding rule.
    #[error("non-canonical encoding: {message}")]
    NonCanonical {
        /// Which rule was violated.
        message: String,
    },

    /// A claimed item length exceeds the decoder's allocation limit.
    #[error("claimed length {claimed} exceeds the {max} byte limit")]
    LengthLimit {
        /// Length claimed by the input.
        claimed: u64,
        /// Maximum the decoder will allocate.
        max: u64,
    },
}

impl CodecError {
    /// Creates an unknown-kind error.
    pub fn unknown_kind(tag: impl Into<String>) -> Self {
        Self::UnknownKind { tag: tag.into() }
    }

    /// Creates an invalid-payload error.
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }

    /// Creates a non-canonical-encoding error.
    pub fn non_canonical(message: impl Into<String>) -> Self {
        Self::NonCanonical {
            message: message.into(),
        }
    }
}
