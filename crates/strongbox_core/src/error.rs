//! Shared error types for the record and credential planes.

use strongbox_codec::CodecError;
use thiserror::Error;
use uuid::Uuid;

/// Result type for record-store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for credential-directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Errors surfaced by record stores.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No store has been provisioned for this user.
    #[error("no record store provisioned for user {user_id}")]
    UserStoreMissing {
        /// The user whose store is missing.
        user_id: String,
    },

    /// The record does not exist in this store.
    #[error("record not found: {record_id}")]
    RecordNotFound {
        /// The id that was looked up.
        record_id: Uuid,
    },

    /// The encoded payload exceeds the size ceiling.
    #[error("payload of {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge {
        /// Encoded payload size.
        size: usize,
        /// The configured ceiling.
        max: usize,
    },

    /// The operation's context was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// Payload encoding or decoding failed.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// An I/O or database fault that does not violate a contract.
    #[error("transient store failure: {message}")]
    Transient {
        /// Description of the underlying fault.
        message: String,
    },
}

impl StoreError {
    /// Creates a missing-user-store error.
    pub fn user_store_missing(user_id: impl Into<String>) -> Self {
        Self::UserStoreMissing {
            user_id: user_id.into(),
        }
    }

    /// Creates a record-not-found error.
    pub fn record_not_found(record_id: Uuid) -> Self {
        Self::RecordNotFound { record_id }
    }

    /// Creates a transient error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    /// Returns true for the not-found case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RecordNotFound { .. })
    }
}

/// Errors surfaced by the credential directory.
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// Registration or login with an empty login string.
    #[error("login cannot be empty")]
    EmptyLogin,

    /// Registration with a login that already exists.
    #[error("login is already taken")]
    LoginTaken,

    /// The login is unknown or the password does not match.
    ///
    /// The two cases are deliberately indistinguishable so callers
    /// cannot enumerate registered logins.
    #[error("unknown login or wrong password")]
    UnknownUser,

    /// An I/O or database fault that does not violate a contract.
    #[error("transient directory failure: {message}")]
    Transient {
        /// Description of the underlying fault.
        message: String,
    },
}

impl DirectoryError {
    /// Creates a transient error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }
}
