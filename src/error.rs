//! Error taxonomy shared by procedures, routing and both transports.
//!
//! # Design Decisions
//! - Step and handler failures share one type so a chain aborts the same way
//!   regardless of which link failed
//! - Classified errors map to a fixed kind → status table at the boundary
//! - Unclassified errors keep their source but never leak it unless
//!   diagnostic logging is enabled (see `http::response`)

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of an explicitly raised application error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotSupported,
    Timeout,
    Conflict,
    PreconditionFailed,
    PayloadTooLarge,
    UnprocessableContent,
    TooManyRequests,
    ClientClosedRequest,
    InternalServerError,
}

impl ErrorKind {
    /// Default HTTP status for this kind.
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::MethodNotSupported => StatusCode::METHOD_NOT_ALLOWED,
            ErrorKind::Timeout => StatusCode::REQUEST_TIMEOUT,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
            ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::UnprocessableContent => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            // Non-standard, nginx convention.
            ErrorKind::ClientClosedRequest => {
                StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_REQUEST)
            }
            ErrorKind::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Rejection produced by a schema check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationFailure {
    pub message: String,
}

impl ValidationFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ValidationFailure {
    fn from(e: serde_json::Error) -> Self {
        Self::new(e.to_string())
    }
}

/// Failure of a step, a handler or the glue around them.
#[derive(Debug, Error)]
pub enum ErpcError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationFailure),

    #[error("{message}")]
    Classified {
        kind: ErrorKind,
        message: String,
        status: Option<StatusCode>,
    },

    #[error(transparent)]
    Unclassified(Box<dyn std::error::Error + Send + Sync>),

    #[error("connection closed")]
    ConnectionClosed,
}

impl ErpcError {
    /// Raise a classified error with the default status for `kind`.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        ErpcError::Classified {
            kind,
            message: message.into(),
            status: None,
        }
    }

    /// Raise a classified error with a custom status code.
    pub fn with_status(kind: ErrorKind, message: impl Into<String>, status: StatusCode) -> Self {
        ErpcError::Classified {
            kind,
            message: message.into(),
            status: Some(status),
        }
    }

    /// Wrap any other error as unclassified.
    pub fn other<E>(e: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        ErpcError::Unclassified(e.into())
    }

    /// Kind reported at the boundary, `None` for unclassified failures.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ErpcError::Validation(_) => Some(ErrorKind::BadRequest),
            ErpcError::Classified { kind, .. } => Some(*kind),
            ErpcError::Unclassified(_) => None,
            ErpcError::ConnectionClosed => Some(ErrorKind::ClientClosedRequest),
        }
    }

    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            ErpcError::Classified {
                status: Some(status),
                ..
            } => *status,
            other => other
                .kind()
                .map(|k| k.status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    /// Message safe to show a caller for classified kinds.
    pub fn public_message(&self) -> String {
        match self {
            ErpcError::Validation(failure) => failure.message.clone(),
            other => other.to_string(),
        }
    }
}

/// Errors raised while compiling a raw route tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("conflicting parameters at '{path}': ':{existing}' and ':{conflicting}'")]
    ConflictingParameters {
        path: String,
        existing: String,
        conflicting: String,
    },

    #[error("empty parameter name at '{path}'")]
    EmptyParameterName { path: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classified_status_table() {
        assert_eq!(
            ErpcError::new(ErrorKind::Unauthorized, "no token").status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ErpcError::new(ErrorKind::ClientClosedRequest, "gone").status().as_u16(),
            499
        );
    }

    #[test]
    fn custom_status_overrides_table() {
        let err = ErpcError::with_status(ErrorKind::BadRequest, "teapot", StatusCode::IM_A_TEAPOT);
        assert_eq!(err.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(err.kind(), Some(ErrorKind::BadRequest));
    }

    #[test]
    fn validation_maps_to_bad_request() {
        let err = ErpcError::from(ValidationFailure::new("missing field `msg`"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "missing field `msg`");
    }

    #[test]
    fn unclassified_has_no_kind() {
        let err = ErpcError::other("disk on fire");
        assert_eq!(err.kind(), None);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn kind_serializes_screaming_snake() {
        let v = serde_json::to_value(ErrorKind::TooManyRequests).unwrap();
        assert_eq!(v, serde_json::json!("TOO_MANY_REQUESTS"));
    }
}
