//! Typed transport messages and their CBOR framing.
//!
//! Every frame is a two-entry map: `op` (the operation tag) followed
//! by `body`. Bodies are maps with canonically ordered keys. Framing
//! is only needed by byte-level transports; in-process transports pass
//! the typed values straight through.

use crate::wire::{parse_uuid, WireRecord};
use strongbox_codec::{CborReader, CborWriter, CodecError, CodecResult};
use uuid::Uuid;

/// Credentials for `Register` and `Login`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    /// The login.
    pub login: String,
    /// The password, sent in the clear within the (TLS-protected)
    /// transport and hashed server-side.
    pub password: String,
}

/// One page of a record listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListRecordsRequest {
    /// Records to skip.
    pub offset: u64,
    /// Maximum records to return.
    pub limit: u64,
}

/// Fetch of a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetRecordRequest {
    /// The record id.
    pub id: Uuid,
}

/// Creation of a record. The wire record must carry a nil id; the
/// server assigns the real one.
#[derive(Debug, Clone, PartialEq)]
pub struct AddRecordRequest {
    /// The record to create.
    pub record: WireRecord,
}

/// Replacement of a record under its existing id.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRecordRequest {
    /// The record to write.
    pub record: WireRecord,
}

/// Deletion of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteRecordRequest {
    /// The record id.
    pub id: Uuid,
}

/// A transport request.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Register a new user.
    Register(AuthRequest),
    /// Authenticate an existing user.
    Login(AuthRequest),
    /// List one page of records.
    ListRecords(ListRecordsRequest),
    /// Fetch one record.
    GetRecord(GetRecordRequest),
    /// Create a record.
    AddRecord(AddRecordRequest),
    /// Replace a record.
    UpdateRecord(UpdateRecordRequest),
    /// Delete a record.
    DeleteRecord(DeleteRecordRequest),
}

/// A transport response.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Identity established; carries the user id the client scopes
    /// every later call with.
    User {
        /// The authenticated user's id.
        user_id: Uuid,
    },
    /// One page of records.
    Records {
        /// The page, in store order.
        records: Vec<WireRecord>,
    },
    /// A single record.
    Record {
        /// The record.
        record: WireRecord,
    },
    /// Acknowledgement carrying the affected record id.
    RecordId {
        /// The id assigned (add) or confirmed (update).
        id: Uuid,
    },
    /// Acknowledgement with no body.
    Done,
}

impl Request {
    fn op(&self) -> &'static str {
        match self {
            Request::Register(_) => "register",
            Request::Login(_) => "login",
            Request::ListRecords(_) => "list",
            Request::GetRecord(_) => "get",
            Request::AddRecord(_) => "add",
            Request::UpdateRecord(_) => "update",
            Request::DeleteRecord(_) => "delete",
        }
    }

    /// Encodes this request as one frame.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut w = CborWriter::new();
        w.map_header(2);
        w.text("op");
        w.text(self.op());
        w.text("body");
        match self {
            Request::Register(auth) | Request::Login(auth) => {
                w.map_header(2);
                w.text("login");
                w.text(&auth.login);
                w.text("password");
                w.text(&auth.password);
            }
            Request::ListRecords(page) => {
                w.map_header(2);
                w.text("limit");
                w.uint(page.limit);
                w.text("offset");
                w.uint(page.offset);
            }
            Request::GetRecord(req) => encode_id_body(&mut w, req.id),
            Request::DeleteRecord(req) => encode_id_body(&mut w, req.id),
            Request::AddRecord(req) => encode_record_body(&mut w, &req.record)?,
            Request::UpdateRecord(req) => encode_record_body(&mut w, &req.record)?,
        }
        Ok(w.into_bytes())
    }

    /// Decodes one request frame.
    pub fn decode(bytes: &[u8]) -> CodecResult<Self> {
        let mut r = CborReader::new(bytes);
        let op = frame_op(&mut r)?;
        let request = match op.as_str() {
            "register" => Request::Register(decode_auth_body(&mut r)?),
            "login" => Request::Login(decode_auth_body(&mut r)?),
            "list" => {
                expect_fields(&mut r, 2)?;
                r.key("limit")?;
                let limit = r.uint()?;
                r.key("offset")?;
                let offset = r.uint()?;
                Request::ListRecords(ListRecordsRequest { offset, limit })
            }
            "get" => Request::GetRecord(GetRecordRequest {
                id: decode_id_body(&mut r)?,
            }),
            "delete" => Request::DeleteRecord(DeleteRecordRequest {
                id: decode_id_body(&mut r)?,
            }),
            "add" => Request::AddRecord(AddRecordRequest {
                record: decode_record_body(&mut r)?,
            }),
            "update" => Request::UpdateRecord(UpdateRecordRequest {
                record: decode_record_body(&mut r)?,
            }),
            other => {
                return Err(CodecError::invalid_payload(format!(
                    "unknown request op: {other}"
                )))
            }
        };
        r.finish()?;
        Ok(request)
    }
}

impl Response {
    fn op(&self) -> &'static str {
        match self {
            Response::User { .. } => "user",
            Response::Records { .. } => "records",
            Response::Record { .. } => "record",
            Response::RecordId { .. } => "record_id",
            Response::Done => "done",
        }
    }

    /// Encodes this response as one frame.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut w = CborWriter::new();
        w.map_header(2);
        w.text("op");
        w.text(self.op());
        w.text("body");
        match self {
            Response::User { user_id } => encode_id_body(&mut w, *user_id),
            Response::RecordId { id } => encode_id_body(&mut w, *id),
            Response::Record { record } => encode_record_body(&mut w, record)?,
            Response::Records { records } => {
                w.map_header(1);
                w.text("records");
                w.array_header(records.len());
                for record in records {
                    record.encode_into(&mut w)?;
                }
            }
            Response::Done => w.map_header(0),
        }
        Ok(w.into_bytes())
    }

    /// Decodes one response frame.
    pub fn decode(bytes: &[u8]) -> CodecResult<Self> {
        let mut r = CborReader::new(bytes);
        let op = frame_op(&mut r)?;
        let response = match op.as_str() {
            "user" => Response::User {
                user_id: decode_id_body(&mut r)?,
            },
            "record_id" => Response::RecordId {
                id: decode_id_body(&mut r)?,
            },
            "record" => Response::Record {
                record: decode_record_body(&mut r)?,
            },
            "records" => {
                expect_fields(&mut r, 1)?;
                r.key("records")?;
                let count = r.array_header()?;
                let mut records = Vec::with_capacity(count);
                for _ in 0..count {
                    records.push(WireRecord::decode_from(&mut r)?);
                }
                Response::Records { records }
            }
            "done" => {
                expect_fields(&mut r, 0)?;
                Response::Done
            }
            other => {
                return Err(CodecError::invalid_payload(format!(
                    "unknown response op: {other}"
                )))
            }
        };
        r.finish()?;
        Ok(response)
    }
}

fn frame_op(r: &mut CborReader<'_>) -> CodecResult<String> {
    expect_fields(r, 2)?;
    r.key("op")?;
    let op = r.text()?;
    r.key("body")?;
    Ok(op)
}

fn expect_fields(r: &mut CborReader<'_>, expected: usize) -> CodecResult<()> {
    let found = r.map_header()?;
    if found != expected {
        return Err(CodecError::invalid_payload(format!(
            "expected {expected} fields, found {found}"
        )));
    }
    Ok(())
}

fn encode_id_body(w: &mut CborWriter, id: Uuid) {
    w.map_header(1);
    w.text("id");
    w.text(&id.to_string());
}

fn decode_id_body(r: &mut CborReader<'_>) -> CodecResult<Uuid> {
    expect_fields(r, 1)?;
    r.key("id")?;
    parse_uuid(&r.text()?)
}

fn encode_record_body(w: &mut CborWriter, record: &WireRecord) -> CodecResult<()> {
    w.map_header(1);
    w.text("record");
    record.encode_into(w)
}

fn decode_record_body(r: &mut CborReader<'_>) -> CodecResult<WireRecord> {
    expect_fields(r, 1)?;
    r.key("record")?;
    WireRecord::decode_from(r)
}

fn decode_auth_body(r: &mut CborReader<'_>) -> CodecResult<AuthRequest> {
    expect_fields(r, 2)?;
    r.key("login")?;
    let login = r.text()?;
    r.key("password")?;
    let password = r.text()?;
    Ok(AuthRequest { login, password })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::millis_to_system_time;
    use strongbox_codec::Payload;
    use strongbox_core::{Metadata, Record};

    fn sample_wire_record() -> WireRecord {
        let now = millis_to_system_time(1_700_000_000_000);
        let record = Record::new(
            Uuid::new_v4(),
            "9d2c1b3a-0f6e-4a7b-9c8d-5e4f3a2b1c0d",
            "note",
            now,
            now,
            &Payload::Text {
                data: "remember".into(),
            },
            vec![Metadata::new("k", "v")],
            false,
            1,
        )
        .unwrap();
        WireRecord::from_record(&record).unwrap()
    }

    #[test]
    fn register_roundtrips() {
        let request = Request::Register(AuthRequest {
            login: "alice".into(),
            password: "pw".into(),
        });
        let bytes = request.encode().unwrap();
        assert_eq!(Request::decode(&bytes).unwrap(), request);
    }

    #[test]
    fn list_roundtrips() {
        let request = Request::ListRecords(ListRecordsRequest {
            offset: 30,
            limit: 30,
        });
        let bytes = request.encode().unwrap();
        assert_eq!(Request::decode(&bytes).unwrap(), request);
    }

    #[test]
    fn update_carries_the_record() {
        let request = Request::UpdateRecord(UpdateRecordRequest {
            record: sample_wire_record(),
        });
        let bytes = request.encode().unwrap();
        assert_eq!(Request::decode(&bytes).unwrap(), request);
    }

    #[test]
    fn records_page_roundtrips() {
        let response = Response::Records {
            records: vec![sample_wire_record(), sample_wire_record()],
        };
        let bytes = response.encode().unwrap();
        assert_eq!(Response::decode(&bytes).unwrap(), response);
    }

    #[test]
    fn done_roundtrips() {
        let bytes = Response::Done.encode().unwrap();
        assert_eq!(Response::decode(&bytes).unwrap(), Response::Done);
    }

    #[test]
    fn unknown_op_is_rejected() {
        let mut w = CborWriter::new();
        w.map_header(2);
        w.text("op");
        w.text("reboot");
        w.text("body");
        w.map_header(0);
        let bytes = w.into_bytes();

        assert!(matches!(
            Request::decode(&bytes),
            Err(CodecError::InvalidPayload { .. })
        ));
    }
}
