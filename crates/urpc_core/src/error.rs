//! Typed error shared by adapters, middleware and the repository layer.
//!
//! # Responsibility
//! - Carry one status-like code plus a human-readable message for every
//!   failure produced by core components.
//! - Let outer HTTP/UI layers translate failures to responses by code only.
//!
//! # Invariants
//! - Core components never produce untyped errors; every failure path maps to
//!   one `ErrorCode`.
//! - "Method not implemented" is a `NOT_FOUND` error that remains
//!   distinguishable through `UrpcError::is_not_implemented`.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub type UrpcResult<T> = Result<T, UrpcError>;

/// Status-like error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotFound,
    BadRequest,
    Unauthorized,
    Forbidden,
    InternalServerError,
}

impl ErrorCode {
    /// Numeric status used by HTTP bindings.
    pub fn status(self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::InternalServerError => 500,
        }
    }

    /// Stable code string, e.g. `NOT_FOUND`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::BadRequest => "BAD_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error value produced by every core failure path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrpcError {
    code: ErrorCode,
    message: String,
    not_implemented: bool,
}

impl UrpcError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            not_implemented: false,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalServerError, message)
    }

    /// Default failure for adapter operations a backend does not support.
    pub fn not_implemented(operation: &str) -> Self {
        Self {
            code: ErrorCode::NotFound,
            message: format!("method `{operation}` not implemented"),
            not_implemented: true,
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn status(&self) -> u16 {
        self.code.status()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns whether this error is the adapter "method not implemented" signal.
    pub fn is_not_implemented(&self) -> bool {
        self.not_implemented
    }
}

impl Display for UrpcError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for UrpcError {}

impl From<serde_json::Error> for UrpcError {
    fn from(value: serde_json::Error) -> Self {
        Self::bad_request(format!("invalid arguments: {value}"))
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorCode, UrpcError};

    #[test]
    fn codes_map_to_http_statuses() {
        assert_eq!(ErrorCode::NotFound.status(), 404);
        assert_eq!(ErrorCode::BadRequest.status(), 400);
        assert_eq!(ErrorCode::Unauthorized.status(), 401);
        assert_eq!(ErrorCode::Forbidden.status(), 403);
        assert_eq!(ErrorCode::InternalServerError.status(), 500);
    }

    #[test]
    fn not_implemented_is_a_not_found_error() {
        let err = UrpcError::not_implemented("findMany");
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert!(err.is_not_implemented());
        assert!(err.message().contains("findMany"));
    }

    #[test]
    fn plain_not_found_is_not_the_unimplemented_signal() {
        let err = UrpcError::not_found("user 1 not found");
        assert!(!err.is_not_implemented());
        assert_eq!(err.to_string(), "[NOT_FOUND] user 1 not found");
    }

    #[test]
    fn json_errors_become_bad_requests() {
        let parse = serde_json::from_str::<serde_json::Value>("{").expect_err("invalid json");
        let err = UrpcError::from(parse);
        assert_eq!(err.code(), ErrorCode::BadRequest);
    }
}
