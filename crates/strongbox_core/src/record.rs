//! The record entity and its creation-time projection.

use crate::error::StoreResult;
use crate::limits::ensure_payload_size;
use crate::metadata::Metadata;
use crate::vector::VersionVector;
use std::time::SystemTime;
use strongbox_codec::{fingerprint_hex, fingerprint_matches, CodecResult, Payload, RecordKind};
use uuid::Uuid;

/// A stored record: envelope plus one typed payload in canonical
/// encoded form.
///
/// Records are immutable by convention; stores produce new values on
/// every mutation. `fingerprint` is always the hex SHA-256 of `data`,
/// and `data` always decodes as `kind`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Globally unique record id, assigned by the store on `add`.
    pub id: Uuid,
    /// Id of the owning user, as carried by the request metadata.
    pub owner: String,
    /// Free-form description.
    pub description: String,
    /// The payload variant stored in `data`.
    pub kind: RecordKind,
    /// Instant of first creation.
    pub created: SystemTime,
    /// Instant of the last mutation, refreshed by stores on write.
    pub modified: SystemTime,
    /// Canonical encoded payload bytes.
    pub data: Vec<u8>,
    /// Hex SHA-256 of `data`.
    pub fingerprint: String,
    /// Ordered metadata pairs; keys need not be unique.
    pub metadata: Vec<Metadata>,
    /// Tombstone flag; transitions false to true exactly once.
    pub deleted: bool,
    /// Per-record monotonic counter, starting at 1.
    pub version: i64,
}

impl Record {
    /// Builds a record from a payload, deriving `data` and
    /// `fingerprint`.
    ///
    /// All envelope fields come from the caller; stores use this when
    /// materializing rows, and tests use it to fabricate replicas.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: Uuid,
        owner: impl Into<String>,
        description: impl Into<String>,
        created: SystemTime,
        modified: SystemTime,
        payload: &Payload,
        metadata: Vec<Metadata>,
        deleted: bool,
        version: i64,
    ) -> CodecResult<Self> {
        let data = payload.encode()?;
        let fingerprint = fingerprint_hex(&data);
        Ok(Self {
            id,
            owner: owner.into(),
            description: description.into(),
            kind: payload.kind(),
            created,
            modified,
            data,
            fingerprint,
            metadata,
            deleted,
            version,
        })
    }

    /// Decodes the stored payload.
    ///
    /// A failure here means the round-trip invariant is broken, i.e.
    /// the stored bytes do not match the envelope kind.
    pub fn payload(&self) -> CodecResult<Payload> {
        Payload::decode(self.kind, &self.data)
    }

    /// Checks the fingerprint against the stored bytes.
    pub fn fingerprint_is_valid(&self) -> bool {
        fingerprint_matches(&self.data, &self.fingerprint)
    }
}

impl VersionVector for Record {
    fn version(&self) -> i64 {
        self.version
    }

    fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

/// The creation-time projection of a record.
///
/// Lacks every field the store assigns: id, owner, created, modified,
/// deleted and version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDraft {
    /// Free-form description.
    pub description: String,
    /// The payload variant encoded in `data`.
    pub kind: RecordKind,
    /// Canonical encoded payload bytes.
    pub data: Vec<u8>,
    /// Hex SHA-256 of `data`.
    pub fingerprint: String,
    /// Ordered metadata pairs.
    pub metadata: Vec<Metadata>,
}

impl RecordDraft {
    /// Encodes the payload and derives the fingerprint, enforcing the
    /// payload-size ceiling.
    pub fn new(
        description: impl Into<String>,
        payload: &Payload,
        metadata: Vec<Metadata>,
    ) -> StoreResult<Self> {
        let data = payload.encode()?;
        ensure_payload_size(data.len())?;
        let fingerprint = fingerprint_hex(&data);
        Ok(Self {
            description: description.into(),
            kind: payload.kind(),
            data,
            fingerprint,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::limits::MAX_PAYLOAD;

    fn auth_payload() -> Payload {
        Payload::Auth {
            login: "alice".into(),
            password: "pw".into(),
        }
    }

    #[test]
    fn draft_derives_fingerprint_from_encoded_bytes() {
        let draft = RecordDraft::new("mail account", &auth_payload(), Vec::new()).unwrap();
        assert_eq!(draft.kind, RecordKind::Auth);
        assert_eq!(draft.fingerprint, fingerprint_hex(&draft.data));
    }

    #[test]
    fn draft_rejects_oversized_payload() {
        let payload = Payload::Binary {
            name: "dump".into(),
            extension: "bin".into(),
            bytes: vec![0u8; MAX_PAYLOAD + 1],
        };
        let result = RecordDraft::new("too big", &payload, Vec::new());
        assert!(matches!(result, Err(StoreError::PayloadTooLarge { .. })));
    }

    #[test]
    fn record_payload_roundtrips() {
        let now = SystemTime::now();
        let record = Record::new(
            Uuid::new_v4(),
            "user-1",
            "mail account",
            now,
            now,
            &auth_payload(),
            vec![Metadata::new("site", "example.com")],
            false,
            1,
        )
        .unwrap();

        assert!(record.fingerprint_is_valid());
        assert_eq!(record.payload().unwrap(), auth_payload());
    }

    #[test]
    fn corrupted_data_fails_fingerprint_check() {
        let now = SystemTime::now();
        let mut record = Record::new(
            Uuid::new_v4(),
            "user-1",
            "note",
            now,
            now,
            &Payload::Text {
                data: "remember the milk".into(),
            },
            Vec::new(),
            false,
            1,
        )
        .unwrap();

        record.data[0] ^= 0x01;
        assert!(!record.fingerprint_is_valid());
    }

    #[test]
    fn equal_payloads_share_a_fingerprint() {
        let a = RecordDraft::new("a", &auth_payload(), Vec::new()).unwrap();
        let b = RecordDraft::new("b", &auth_payload(), Vec::new()).unwrap();
        assert_eq!(a.fingerprint, b.fingerprint);
    }
}
