//! Content fingerprints over encoded payload bytes.

use sha2::{Digest, Sha256};

/// Computes the hex-encoded SHA-256 fingerprint of encoded payload
/// bytes.
///
/// The hash is fed incrementally, so the input is never copied.
pub fn fingerprint_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Checks data against a previously computed fingerprint.
pub fn fingerprint_matches(data: &[u8], fingerprint: &str) -> bool {
    fingerprint_hex(data) == fingerprint
}
