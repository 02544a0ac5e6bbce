//! The record store on the far side of the transport.

use std::time::SystemTime;
use strongbox_core::{
    ensure_payload_size, CancelToken, DirectoryError, DirectoryResult, Record, RecordDraft,
    RecordStore, StoreError, StoreResult,
};
use strongbox_codec::Payload;
use strongbox_proto::{
    AddRecordRequest, AuthRequest, CallMeta, DeleteRecordRequest, GetRecordRequest,
    ListRecordsRequest, Request, Response, ServiceError, StatusCode, Transport,
    UpdateRecordRequest, WireRecord,
};
use uuid::Uuid;

/// A [`RecordStore`] that forwards every operation over a
/// [`Transport`].
///
/// This is the client's view of the central store. It attaches the
/// `userid` metadata to every data-plane call, enforces the
/// payload-size ceiling before anything leaves the process, and
/// re-encodes incoming wire payloads through the canonical codec
/// before handing records onward.
///
/// Replicating a tombstone over the wire is expressed as a delete: the
/// wire form carries no tombstone flag, and the server removes the
/// rows once the deletion has reached it.
pub struct RemoteStore<T: Transport> {
    transport: T,
}

impl<T: Transport> RemoteStore<T> {
    /// Creates a remote store over a transport.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Registers a new user and returns the assigned user id.
    ///
    /// The empty-login check runs client-side so the directory error
    /// is immediate and no credentials travel pointlessly.
    pub fn register(&self, login: &str, password: &str) -> DirectoryResult<Uuid> {
        self.identity_call(login, |auth| Request::Register(auth), password)
    }

    /// Authenticates an existing user and returns their user id.
    pub fn login(&self, login: &str, password: &str) -> DirectoryResult<Uuid> {
        self.identity_call(login, |auth| Request::Login(auth), password)
    }

    fn identity_call(
        &self,
        login: &str,
        make_request: impl FnOnce(AuthRequest) -> Request,
        password: &str,
    ) -> DirectoryResult<Uuid> {
        if login.trim().is_empty() {
            return Err(DirectoryError::EmptyLogin);
        }

        let request = make_request(AuthRequest {
            login: login.to_string(),
            password: password.to_string(),
        });

        match self.transport.call(&CallMeta::new(), request) {
            Ok(Response::User { user_id }) => Ok(user_id),
            Ok(other) => Err(DirectoryError::transient(format!(
                "unexpected identity response: {other:?}"
            ))),
            Err(e) => Err(directory_error(e)),
        }
    }

    fn data_call(&self, user_id: &str, request: Request) -> Result<Response, ServiceError> {
        self.transport
            .call(&CallMeta::with_user_id(user_id), request)
    }
}

impl<T: Transport> RecordStore for RemoteStore<T> {
    fn label(&self) -> &'static str {
        "remote"
    }

    fn list(
        &self,
        ctx: &CancelToken,
        user_id: &str,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<Record>> {
        ctx.ensure_active()?;
        let request = Request::ListRecords(ListRecordsRequest {
            offset: offset as u64,
            limit: limit as u64,
        });
        match self.data_call(user_id, request) {
            Ok(Response::Records { records }) => records
                .into_iter()
                .map(|wire| wire.into_record().map_err(StoreError::from))
                .collect(),
            Ok(other) => Err(unexpected_response("list", &other)),
            Err(e) => Err(store_error(e, None)),
        }
    }

    fn get(&self, ctx: &CancelToken, user_id: &str, record_id: Uuid) -> StoreResult<Record> {
        ctx.ensure_active()?;
        let request = Request::GetRecord(GetRecordRequest { id: record_id });
        match self.data_call(user_id, request) {
            Ok(Response::Record { record }) => Ok(record.into_record()?),
            Ok(other) => Err(unexpected_response("get", &other)),
            Err(e) => Err(store_error(e, Some(record_id))),
        }
    }

    fn add(&self, ctx: &CancelToken, user_id: &str, draft: &RecordDraft) -> StoreResult<Record> {
        ctx.ensure_active()?;
        ensure_payload_size(draft.data.len())?;

        let now = SystemTime::now();
        let payload = Payload::decode(draft.kind, &draft.data)?;
        let request = Request::AddRecord(AddRecordRequest {
            record: WireRecord {
                // Nil id: the server is the one assigning identities.
                id: Uuid::nil(),
                owner: user_id.to_string(),
                description: draft.description.clone(),
                payload,
                fingerprint: draft.fingerprint.clone(),
                created: now,
                modified: now,
                metadata: draft.metadata.clone(),
                version: 1,
            },
        });

        match self.data_call(user_id, request) {
            Ok(Response::RecordId { id }) => Ok(Record {
                id,
                owner: user_id.to_string(),
                description: draft.description.clone(),
                kind: draft.kind,
                created: now,
                modified: now,
                data: draft.data.clone(),
                fingerprint: draft.fingerprint.clone(),
                metadata: draft.metadata.clone(),
                deleted: false,
                version: 1,
            }),
            Ok(other) => Err(unexpected_response("add", &other)),
            Err(e) => Err(store_error(e, None)),
        }
    }

    fn update(&self, ctx: &CancelToken, user_id: &str, record: &Record) -> StoreResult<Record> {
        ctx.ensure_active()?;
        ensure_payload_size(record.data.len())?;

        // A tombstone crosses the wire as a deletion. Absence on the
        // far side means the deletion already propagated.
        if record.deleted {
            match self.delete(ctx, user_id, record.id) {
                Ok(()) => {}
                Err(StoreError::RecordNotFound { .. }) => {}
                Err(e) => return Err(e),
            }
            return Ok(record.clone());
        }

        let request = Request::UpdateRecord(UpdateRecordRequest {
            record: WireRecord::from_record(record)?,
        });
        match self.data_call(user_id, request) {
            Ok(Response::RecordId { .. }) => Ok(record.clone()),
            Ok(other) => Err(unexpected_response("update", &other)),
            Err(e) => Err(store_error(e, Some(record.id))),
        }
    }

    fn delete(&self, ctx: &CancelToken, user_id: &str, record_id: Uuid) -> StoreResult<()> {
        ctx.ensure_active()?;
        let request = Request::DeleteRecord(DeleteRecordRequest { id: record_id });
        match self.data_call(user_id, request) {
            Ok(Response::Done) => Ok(()),
            Ok(other) => Err(unexpected_response("delete", &other)),
            Err(e) => Err(store_error(e, Some(record_id))),
        }
    }
}

fn unexpected_response(op: &str, response: &Response) -> StoreError {
    StoreError::transient(format!("unexpected {op} response: {response:?}"))
}

/// Maps a transport failure onto the store error vocabulary.
fn store_error(err: ServiceError, record_id: Option<Uuid>) -> StoreError {
    match (err.code, record_id) {
        (StatusCode::NotFound, Some(record_id)) => StoreError::record_not_found(record_id),
        _ => StoreError::transient(err.to_string()),
    }
}

/// Maps an identity-call failure onto the directory vocabulary.
///
/// The server signals a taken login with `InvalidArgument`; empty
/// logins never reach it, so the mapping is unambiguous.
fn directory_error(err: ServiceError) -> DirectoryError {
    match err.code {
        StatusCode::Unauthenticated => DirectoryError::UnknownUser,
        StatusCode::InvalidArgument => DirectoryError::LoginTaken,
        _ => DirectoryError::transient(err.to_string()),
    }
}
