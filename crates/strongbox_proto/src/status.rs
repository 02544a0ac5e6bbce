//! Status codes and the service error carried back to callers.

use thiserror::Error;

/// Result type for transport calls.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// The transport status vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// The call succeeded.
    Ok,
    /// The `userid` metadata entry is missing or empty, or the
    /// credentials did not check out.
    Unauthenticated,
    /// The addressed record does not exist.
    NotFound,
    /// The request is malformed: payload too large, unknown type tag,
    /// or a client-assigned id where the server assigns one.
    InvalidArgument,
    /// A store failure.
    Internal,
}

impl StatusCode {
    /// Stable wire tag for this code.
    pub fn as_str(self) -> &'static str {
        match self {
            StatusCode::Ok => "ok",
            StatusCode::Unauthenticated => "unauthenticated",
            StatusCode::NotFound => "not_found",
            StatusCode::InvalidArgument => "invalid_argument",
            StatusCode::Internal => "internal",
        }
    }

    /// Resolves a wire tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "ok" => Some(StatusCode::Ok),
            "unauthenticated" => Some(StatusCode::Unauthenticated),
            "not_found" => Some(StatusCode::NotFound),
            "invalid_argument" => Some(StatusCode::InvalidArgument),
            "internal" => Some(StatusCode::Internal),
            _ => None,
        }
    }
}

/// A failed call: status code plus one diagnostic message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} ({message})", code.as_str())]
pub struct ServiceError {
    /// The status code.
    pub code: StatusCode,
    /// Diagnostic with enough context to identify the failing record
    /// and store.
    pub message: String,
}

impl ServiceError {
    /// Creates a service error.
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Shorthand for an `Unauthenticated` error.
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(StatusCode::Unauthenticated, message)
    }

    /// Shorthand for a `NotFound` error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NotFound, message)
    }

    /// Shorthand for an `InvalidArgument` error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(StatusCode::InvalidArgument, message)
    }

    /// Shorthand for an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::Internal, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_roundtrip() {
        for code in [
            StatusCode::Ok,
            StatusCode::Unauthenticated,
            StatusCode::NotFound,
            StatusCode::InvalidArgument,
            StatusCode::Internal,
        ] {
            assert_eq!(StatusCode::from_tag(code.as_str()), Some(code));
        }
        assert_eq!(StatusCode::from_tag("teapot"), None);
    }

    #[test]
    fn display_includes_code_and_message() {
        let err = ServiceError::not_found("record 42");
        assert_eq!(err.to_string(), "not_found (record 42)");
    }
}
