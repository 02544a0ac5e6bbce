//! An in-process transport for tests and single-process deployments.

use crate::service::Server;
use std::sync::Arc;
use strongbox_core::CancelToken;
use strongbox_proto::{CallMeta, Request, Response, ServiceError, ServiceResult, Transport};

/// A [`Transport`] that routes calls straight into a [`Server`].
///
/// The request and response still pass through their byte framing, so
/// everything a network transport would exercise (except the socket)
/// runs here too.
pub struct LoopbackTransport {
    server: Arc<Server>,
}

impl LoopbackTransport {
    /// Creates a loopback onto the given server.
    pub fn new(server: Arc<Server>) -> Self {
        Self { server }
    }
}

impl Transport for LoopbackTransport {
    fn call(&self, meta: &CallMeta, request: Request) -> ServiceResult<Response> {
        let frame = request
            .encode()
            .map_err(|e| ServiceError::internal(format!("encoding the request: {e}")))?;
        let request = Request::decode(&frame)
            .map_err(|e| ServiceError::internal(format!("decoding the request: {e}")))?;

        let response = self.server.handle(&CancelToken::new(), meta, request)?;

        let frame = response
            .encode()
            .map_err(|e| ServiceError::internal(format!("encoding the response: {e}")))?;
        Response::decode(&frame)
            .map_err(|e| ServiceError::internal(format!("decoding the response: {e}")))
    }
}
