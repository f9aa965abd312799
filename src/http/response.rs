//! Response envelope and error boundary.
//!
//! # Responsibilities
//! - Wrap handler results as `{ success: true, result }`
//! - Map failures to `{ success: false, error }` with the right status
//! - Log failures once, at the boundary
//!
//! # Design Decisions
//! - Classified and validation failures always expose kind and message
//! - Unclassified failures only expose their message when `log_errors` is on
//! - A custom handler replaces the default rendering entirely

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErpcError, ErrorKind};

/// Body of every procedure response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Envelope {
    pub fn ok(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(error: Option<ErrorBody>) -> Self {
        Self {
            success: false,
            result: None,
            error,
        }
    }
}

/// `error` member of a failed envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorBody {
    Typed {
        #[serde(rename = "type")]
        kind: ErrorKind,
        message: String,
    },
    Message(String),
}

/// Replacement for the default error rendering.
pub type ErrorHandler = Arc<dyn Fn(&ErpcError) -> Response + Send + Sync>;

/// Success response for a handler result.
pub fn success(result: Value) -> Response {
    (StatusCode::OK, Json(Envelope::ok(result))).into_response()
}

/// Catches every step and handler failure on both transports.
#[derive(Clone)]
pub struct ErrorBoundary {
    log_errors: bool,
    custom: Option<ErrorHandler>,
}

impl std::fmt::Debug for ErrorBoundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorBoundary")
            .field("log_errors", &self.log_errors)
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

impl ErrorBoundary {
    pub fn new(log_errors: bool) -> Self {
        Self {
            log_errors,
            custom: None,
        }
    }

    /// Render failures with `handler` instead of the envelope.
    pub fn with_handler(mut self, handler: ErrorHandler) -> Self {
        self.custom = Some(handler);
        self
    }

    pub fn log_errors(&self) -> bool {
        self.log_errors
    }

    /// Log a failure. `context` names the request or event.
    pub fn report(&self, err: &ErpcError, context: &str) {
        match err {
            ErpcError::Unclassified(source) => {
                if self.log_errors {
                    tracing::error!(context = %context, error = %source, "Unhandled error");
                }
            }
            ErpcError::ConnectionClosed => {
                tracing::debug!(context = %context, "Peer went away");
            }
            other => {
                tracing::debug!(
                    context = %context,
                    kind = ?other.kind(),
                    error = %other,
                    "Request rejected"
                );
            }
        }
    }

    /// Status and envelope for a failure.
    pub fn envelope(&self, err: &ErpcError) -> (StatusCode, Envelope) {
        let body = match (err, err.kind()) {
            (ErpcError::Unclassified(source), _) => {
                self.log_errors.then(|| ErrorBody::Message(source.to_string()))
            }
            (_, Some(kind)) => Some(ErrorBody::Typed {
                kind,
                message: err.public_message(),
            }),
            (_, None) => None,
        };
        (err.status(), Envelope::failed(body))
    }

    /// Report and render a failure.
    pub fn respond(&self, err: &ErpcError, context: &str) -> Response {
        self.report(err, context);
        if let Some(custom) = &self.custom {
            return custom(err);
        }
        let (status, envelope) = self.envelope(err);
        (status, Json(envelope)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationFailure;
    use serde_json::json;

    #[test]
    fn success_envelope_shape() {
        let v = serde_json::to_value(Envelope::ok(json!({"echo": "hi"}))).unwrap();
        assert_eq!(v, json!({"success": true, "result": {"echo": "hi"}}));
    }

    #[test]
    fn classified_error_is_typed() {
        let boundary = ErrorBoundary::new(false);
        let (status, envelope) = boundary.envelope(&ErpcError::new(ErrorKind::Unauthorized, "no token"));
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            serde_json::to_value(envelope).unwrap(),
            json!({"success": false, "error": {"type": "UNAUTHORIZED", "message": "no token"}})
        );
    }

    #[test]
    fn validation_error_is_bad_request() {
        let boundary = ErrorBoundary::new(false);
        let err = ErpcError::from(ValidationFailure::new("invalid type: integer `5`"));
        let (status, envelope) = boundary.envelope(&err);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            envelope.error,
            Some(ErrorBody::Typed {
                kind: ErrorKind::BadRequest,
                message: "invalid type: integer `5`".into(),
            })
        );
    }

    #[test]
    fn unclassified_message_follows_log_errors() {
        let err = ErpcError::other("db down");

        let (status, shown) = ErrorBoundary::new(true).envelope(&err);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            serde_json::to_value(shown).unwrap(),
            json!({"success": false, "error": "db down"})
        );

        let (_, hidden) = ErrorBoundary::new(false).envelope(&err);
        assert_eq!(serde_json::to_value(hidden).unwrap(), json!({"success": false}));
    }

    #[test]
    fn custom_handler_replaces_rendering() {
        let boundary = ErrorBoundary::new(true)
            .with_handler(Arc::new(|_| StatusCode::IM_A_TEAPOT.into_response()));
        let response = boundary.respond(&ErpcError::other("x"), "test");
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    }
}
