//! The transport seam.

use crate::messages::{Request, Response};
use crate::meta::CallMeta;
use crate::status::ServiceResult;

/// One round trip to the server.
///
/// Implementations own marshalling and delivery: a network transport
/// frames the typed messages with their `encode`/`decode` methods,
/// while the in-process loopback passes them straight to the service
/// handlers. Failures come back as
/// [`ServiceError`](crate::ServiceError) with a transport status code.
pub trait Transport: Send + Sync {
    /// Performs one call with the given metadata.
    fn call(&self, meta: &CallMeta, request: Request) -> ServiceResult<Response>;
}
