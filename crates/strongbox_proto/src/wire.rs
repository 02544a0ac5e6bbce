//! The record wire form.

use std::time::{Duration, SystemTime, UNIX_EPOCH};
use strongbox_codec::{
    fingerprint_hex, CborReader, CborWriter, CodecError, CodecResult, Payload, RecordKind,
};
use strongbox_core::{Metadata, Record};
use uuid::Uuid;

/// Converts an instant to unix milliseconds for the wire.
///
/// Instants before the epoch clamp to zero; the stores never produce
/// them.
pub fn system_time_to_millis(t: SystemTime) -> i64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_millis()).unwrap_or(i64::MAX),
        Err(_) => 0,
    }
}

/// Converts unix milliseconds back to an instant.
pub fn millis_to_system_time(ms: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(u64::try_from(ms).unwrap_or(0))
}

/// A record as it crosses the transport.
///
/// The payload travels in variant form rather than as stored bytes;
/// [`WireRecord::into_record`] re-encodes it through the canonical
/// codec so the persisted byte form is canonical no matter who sent
/// it. There is no tombstone flag on the wire: replicating a deletion
/// is expressed as a `DeleteRecord` call.
///
/// A nil `id` means "unassigned": `AddRecord` requires it, and the
/// server rejects an add carrying any other id.
#[derive(Debug, Clone, PartialEq)]
pub struct WireRecord {
    /// Record id, or nil when the server is expected to assign one.
    pub id: Uuid,
    /// Owning user id.
    pub owner: String,
    /// Free-form description.
    pub description: String,
    /// The payload in variant form.
    pub payload: Payload,
    /// Sender-side fingerprint; receivers recompute it after
    /// re-encoding.
    pub fingerprint: String,
    /// Creation instant.
    pub created: SystemTime,
    /// Last-mutation instant.
    pub modified: SystemTime,
    /// Ordered metadata pairs.
    pub metadata: Vec<Metadata>,
    /// Per-record version counter.
    pub version: i64,
}

impl WireRecord {
    /// Builds the wire form of a stored record by decoding its
    /// payload.
    pub fn from_record(record: &Record) -> CodecResult<Self> {
        Ok(Self {
            id: record.id,
            owner: record.owner.clone(),
            description: record.description.clone(),
            payload: record.payload()?,
            fingerprint: record.fingerprint.clone(),
            created: record.created,
            modified: record.modified,
            metadata: record.metadata.clone(),
            version: record.version,
        })
    }

    /// Materializes a stored record, re-encoding the payload
    /// canonically and recomputing the fingerprint over the canonical
    /// bytes.
    pub fn into_record(self) -> CodecResult<Record> {
        let data = self.payload.encode()?;
        let fingerprint = fingerprint_hex(&data);
        Ok(Record {
            id: self.id,
            owner: self.owner,
            description: self.description,
            kind: self.payload.kind(),
            created: self.created,
            modified: self.modified,
            data,
            fingerprint,
            metadata: self.metadata,
            deleted: false,
            version: self.version,
        })
    }

    /// Writes this record as one CBOR map.
    ///
    /// Keys are emitted in canonical order; `type` precedes `payload`
    /// so decoders know the variant before its fields arrive.
    pub fn encode_into(&self, w: &mut CborWriter) -> CodecResult<()> {
        w.map_header(10);
        w.text("id");
        w.text(&self.id.to_string());
        w.text("type");
        w.text(self.payload.kind().as_str());
        w.text("owner");
        w.text(&self.owner);
        w.text("created");
        w.int(system_time_to_millis(self.created));
        w.text("payload");
        self.payload.encode_into(w)?;
        w.text("version");
        w.int(self.version);
        w.text("metadata");
        w.array_header(self.metadata.len());
        for pair in &self.metadata {
            w.map_header(2);
            w.text("key");
            w.text(&pair.key);
            w.text("value");
            w.text(&pair.value);
        }
        w.text("modified");
        w.int(system_time_to_millis(self.modified));
        w.text("description");
        w.text(&self.description);
        w.text("fingerprint");
        w.text(&self.fingerprint);
        Ok(())
    }

    /// Reads one record map from a reader.
    pub fn decode_from(r: &mut CborReader<'_>) -> CodecResult<Self> {
        let entries = r.map_header()?;
        if entries != 10 {
            return Err(CodecError::invalid_payload(format!(
                "expected 10 record fields, found {entries}"
            )));
        }

        r.key("id")?;
        let id = parse_uuid(&r.text()?)?;
        r.key("type")?;
        let kind = RecordKind::from_tag(&r.text()?)?;
        r.key("owner")?;
        let owner = r.text()?;
        r.key("created")?;
        let created = millis_to_system_time(r.int()?);
        r.key("payload")?;
        let payload = Payload::decode_from(kind, r)?;
        r.key("version")?;
        let version = r.int()?;
        r.key("metadata")?;
        let pairs = r.array_header()?;
        let mut metadata = Vec::with_capacity(pairs);
        for _ in 0..pairs {
            let fields = r.map_header()?;
            if fields != 2 {
                return Err(CodecError::invalid_payload("metadata pair must have 2 fields"));
            }
            r.key("key")?;
            let key = r.text()?;
            r.key("value")?;
            let value = r.text()?;
            metadata.push(Metadata::new(key, value));
        }
        r.key("modified")?;
        let modified = millis_to_system_time(r.int()?);
        r.key("description")?;
        let description = r.text()?;
        r.key("fingerprint")?;
        let fingerprint = r.text()?;

        Ok(Self {
            id,
            owner,
            description,
            payload,
            fingerprint,
            created,
            modified,
            metadata,
            version,
        })
    }
}

pub(crate) fn parse_uuid(text: &str) -> CodecResult<Uuid> {
    Uuid::parse_str(text)
        .map_err(|_| CodecError::invalid_payload(format!("malformed uuid: {text}")))
}
