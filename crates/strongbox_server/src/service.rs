//! Request handlers: the authorization surface plus store dispatch.

use crate::directory::Directory;
use std::sync::Arc;
use strongbox_core::{
    ensure_payload_size, CancelToken, DirectoryError, RecordDraft, RecordStore, StoreError,
};
use strongbox_proto::{
    AuthRequest, CallMeta, ListRecordsRequest, Request, Response, ServiceError, ServiceResult,
    WireRecord, USER_ID_KEY,
};
use tracing::warn;
use uuid::Uuid;

/// Handlers for the record operations.
///
/// Every call extracts the caller identity from the `userid` metadata
/// entry: the value is trimmed and the call rejected with
/// `Unauthenticated` when missing or empty; otherwise it passes
/// verbatim to the store as the user id.
///
/// Incoming wire payloads are re-encoded through the canonical codec
/// (and size-checked) before they reach the store, so persisted bytes
/// are canonical regardless of the sender. Tombstoned rows never
/// cross this surface: the wire has no tombstone flag, so they read as
/// absent.
pub struct RecordsService {
    store: Arc<dyn RecordStore>,
}

impl RecordsService {
    /// Creates the service over a record store.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    fn caller(meta: &CallMeta) -> ServiceResult<String> {
        let raw = meta.user_id().ok_or_else(|| {
            ServiceError::unauthenticated(format!("metadata entry {USER_ID_KEY} is required"))
        })?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ServiceError::unauthenticated(format!(
                "metadata entry {USER_ID_KEY} is empty"
            )));
        }
        Ok(trimmed.to_string())
    }

    /// Lists one page of the caller's records.
    pub fn list(
        &self,
        ctx: &CancelToken,
        meta: &CallMeta,
        request: ListRecordsRequest,
    ) -> ServiceResult<Response> {
        let user_id = Self::caller(meta)?;
        let records = self
            .store
            .list(ctx, &user_id, request.offset as usize, request.limit as usize)
            .map_err(store_status)?;

        let mut page = Vec::with_capacity(records.len());
        for record in records.iter().filter(|r| !r.deleted) {
            page.push(WireRecord::from_record(record).map_err(codec_status)?);
        }
        Ok(Response::Records { records: page })
    }

    /// Fetches one record.
    pub fn get(
        &self,
        ctx: &CancelToken,
        meta: &CallMeta,
        record_id: Uuid,
    ) -> ServiceResult<Response> {
        let user_id = Self::caller(meta)?;
        let record = self
            .store
            .get(ctx, &user_id, record_id)
            .map_err(store_status)?;
        if record.deleted {
            return Err(ServiceError::not_found(format!(
                "record not found: {record_id}"
            )));
        }
        Ok(Response::Record {
            record: WireRecord::from_record(&record).map_err(codec_status)?,
        })
    }

    /// Creates a record. The store assigns id, instants and version;
    /// a wire record that already carries an id is rejected.
    pub fn add(
        &self,
        ctx: &CancelToken,
        meta: &CallMeta,
        record: WireRecord,
    ) -> ServiceResult<Response> {
        let user_id = Self::caller(meta)?;
        if !record.id.is_nil() {
            return Err(ServiceError::invalid_argument(
                "record ids are assigned by the server; the add request must not carry one",
            ));
        }

        let draft = RecordDraft::new(record.description, &record.payload, record.metadata)
            .map_err(store_status)?;
        let stored = self
            .store
            .add(ctx, &user_id, &draft)
            .map_err(store_status)?;
        Ok(Response::RecordId { id: stored.id })
    }

    /// Replaces a record under its existing id with the caller's
    /// version.
    pub fn update(
        &self,
        ctx: &CancelToken,
        meta: &CallMeta,
        record: WireRecord,
    ) -> ServiceResult<Response> {
        let user_id = Self::caller(meta)?;
        let mut record = record.into_record().map_err(codec_status)?;
        ensure_payload_size(record.data.len()).map_err(store_status)?;
        record.owner = user_id.clone();

        let stored = self
            .store
            .update(ctx, &user_id, &record)
            .map_err(store_status)?;
        Ok(Response::RecordId { id: stored.id })
    }

    /// Deletes a record.
    pub fn delete(
        &self,
        ctx: &CancelToken,
        meta: &CallMeta,
        record_id: Uuid,
    ) -> ServiceResult<Response> {
        let user_id = Self::caller(meta)?;
        self.store
            .delete(ctx, &user_id, record_id)
            .map_err(store_status)?;
        Ok(Response::Done)
    }
}

/// Handlers for the identity operations.
pub struct UsersService {
    directory: Directory,
}

impl UsersService {
    /// Creates the service over a credential directory.
    pub fn new(directory: Directory) -> Self {
        Self { directory }
    }

    /// Registers a new user.
    pub fn register(&self, ctx: &CancelToken, request: &AuthRequest) -> ServiceResult<Response> {
        let user = self
            .directory
            .register(ctx, &request.login, &request.password)
            .map_err(directory_status)?;
        Ok(Response::User { user_id: user.id })
    }

    /// Authenticates an existing user.
    pub fn login(&self, ctx: &CancelToken, request: &AuthRequest) -> ServiceResult<Response> {
        let user = self
            .directory
            .authenticate(ctx, &request.login, &request.password)
            .map_err(directory_status)?;
        Ok(Response::User { user_id: user.id })
    }
}

/// The full server surface: identity plus records, one dispatch point.
pub struct Server {
    records: RecordsService,
    users: UsersService,
}

impl Server {
    /// Creates a server over a record store and a credential
    /// directory.
    pub fn new(store: Arc<dyn RecordStore>, directory: Directory) -> Self {
        Self {
            records: RecordsService::new(store),
            users: UsersService::new(directory),
        }
    }

    /// The records service.
    pub fn records(&self) -> &RecordsService {
        &self.records
    }

    /// Dispatches one request to its handler.
    pub fn handle(
        &self,
        ctx: &CancelToken,
        meta: &CallMeta,
        request: Request,
    ) -> ServiceResult<Response> {
        let result = match request {
            Request::Register(auth) => self.users.register(ctx, &auth),
            Request::Login(auth) => self.users.login(ctx, &auth),
            Request::ListRecords(page) => self.records.list(ctx, meta, page),
            Request::GetRecord(req) => self.records.get(ctx, meta, req.id),
            Request::AddRecord(req) => self.records.add(ctx, meta, req.record),
            Request::UpdateRecord(req) => self.records.update(ctx, meta, req.record),
            Request::DeleteRecord(req) => self.records.delete(ctx, meta, req.id),
        };

        if let Err(e) = &result {
            warn!(code = e.code.as_str(), message = %e.message, "request failed");
        }
        result
    }
}

/// Store errors mapped onto transport status codes.
fn store_status(err: StoreError) -> ServiceError {
    match err {
        StoreError::RecordNotFound { .. } => ServiceError::not_found(err.to_string()),
        StoreError::PayloadTooLarge { .. } => ServiceError::invalid_argument(err.to_string()),
        StoreError::Codec(_) => ServiceError::invalid_argument(err.to_string()),
        StoreError::UserStoreMissing { .. }
        | StoreError::Cancelled
        | StoreError::Transient { .. } => ServiceError::internal(err.to_string()),
    }
}

fn codec_status(err: strongbox_codec::CodecError) -> ServiceError {
    ServiceError::invalid_argument(err.to_string())
}

/// Directory errors mapped onto transport status codes.
fn directory_status(err: DirectoryError) -> ServiceError {
    match err {
        DirectoryError::EmptyLogin | DirectoryError::LoginTaken => {
            ServiceError::invalid_argument(err.to_string())
        }
        DirectoryError::UnknownUser => ServiceError::unauthenticated(err.to_string()),
        DirectoryError::Transient { .. } => ServiceError::internal(err.to_string()),
    }
}
