//! Error types for the sync engine.

use std::time::Duration;
use strongbox_core::StoreError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during reconciliation.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A store call failed during a sweep; the cycle was aborted.
    #[error("sync from {source_store} to {target_store} failed: {underlying}")]
    SyncFailed {
        /// Label of the store the sweep was reading.
        source_store: &'static str,
        /// Label of the store the sweep was writing.
        target_store: &'static str,
        /// The store error that aborted the cycle.
        #[source]
        underlying: StoreError,
    },

    /// The controlling token was cancelled.
    #[error("sync cancelled")]
    Cancelled,

    /// The bounded first sync ran out of time.
    #[error("first sync exceeded its {deadline:?} deadline")]
    DeadlineElapsed {
        /// The budget that elapsed.
        deadline: Duration,
    },
}

impl SyncError {
    /// Wraps a store error with the sweep direction, promoting
    /// cancellation to its own variant.
    pub fn during_sweep(
        source_store: &'static str,
        target_store: &'static str,
        underlying: StoreError,
    ) -> Self {
        match underlying {
            StoreError::Cancelled => SyncError::Cancelled,
            underlying => SyncError::SyncFailed {
                source_store,
                target_store,
                underlying,
            },
        }
    }
}
