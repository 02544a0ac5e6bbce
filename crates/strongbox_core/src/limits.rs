//! The payload-size ceiling.

use crate::error::{StoreError, StoreResult};

/// Maximum size of an encoded record payload, in bytes.
///
/// This is the single knob for the whole system: the draft
/// constructor, the remote client and the server boundary all enforce
/// it. Payloads larger than this are rejected outright; there is no
/// chunked transfer.
pub const MAX_PAYLOAD: usize = 40 * 1024 * 1024;

/// Rejects encoded payloads above [`MAX_PAYLOAD`].
pub fn ensure_payload_size(size: usize) -> StoreResult<()> {
    if size > MAX_PAYLOAD {
        return Err(StoreError::PayloadTooLarge {
            size,
            max: MAX_PAYLOAD,
        });
    }
    Ok(())
}
