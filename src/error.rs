//! # Error Module
//!
//! Two error families flow through specrouter:
//!
//! - [`BuildError`] is raised while the routing table is assembled. Every variant is
//!   fatal: a router that fails to build must not serve traffic.
//! - [`HttpError`] is the per-request failure value. Every gate of the request
//!   pipeline (body parsing, schema validation, method guard, handler dispatch)
//!   reports through it, and exactly one [`ErrorHandler`](crate::server::ErrorHandler)
//!   turns it into a response.

use http::{Method, StatusCode};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::validator::ValidationIssue;

/// Construction-time failure. Returned by [`AppService::build`](crate::server::AppService::build).
#[derive(Debug, Error)]
pub enum BuildError {
    /// An operation was declared without an `operationId`.
    #[error("operationId is not defined for {method} {path}")]
    MissingOperationId { method: Method, path: String },

    /// The controller registry has no entry for a declared `operationId`.
    #[error("handler is not defined for operationId: {operation_id}")]
    MissingController { operation_id: String },

    /// The document failed structural validation.
    #[error("specification failed structural validation with {} issue(s)", .0.len())]
    InvalidSpec(Vec<ValidationIssue>),

    /// A translated path could not be compiled into a matcher.
    #[error("invalid route pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

impl BuildError {
    /// Validation issues carried by [`BuildError::InvalidSpec`], empty otherwise.
    #[must_use]
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            BuildError::InvalidSpec(issues) => issues,
            _ => &[],
        }
    }
}

/// Request-time failure with an HTTP status.
///
/// Mirrors the shape of the classic `http-errors` objects: a `name` derived from the
/// status (`BadRequestError`, `MethodNotAllowedError`, `InternalServerError`), a
/// message, an `expose` flag (true for 4xx) and optional extra fields that the error
/// handler copies into the JSON body.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct HttpError {
    status: StatusCode,
    name: String,
    message: String,
    expose: bool,
    fields: Map<String, Value>,
    headers: Vec<(String, String)>,
}

impl HttpError {
    /// Create an error for `status`. Non-error statuses are coerced to 500.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        let status = if status.is_client_error() || status.is_server_error() {
            status
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            name: error_name(status),
            message: message.into(),
            expose: status.is_client_error(),
            fields: Map::new(),
            headers: Vec::new(),
        }
    }

    /// Create an error for a numeric status, falling back to 500 for invalid codes.
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, message)
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    #[must_use]
    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
    }

    #[must_use]
    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, message)
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Attach an extra field rendered next to `name` in the JSON body.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Attach a response header (e.g. `Allow` on 405).
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the message is safe to show to the client.
    #[must_use]
    pub fn expose(&self) -> bool {
        self.expose
    }

    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

/// Errors raised with `anyhow` keep the status of an inner [`HttpError`]; anything
/// else is an internal error.
impl From<anyhow::Error> for HttpError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<HttpError>() {
            Ok(http) => http,
            Err(other) => HttpError::internal(format!("{other:#}")),
        }
    }
}

/// `Bad Request` -> `BadRequestError`, `Internal Server Error` -> `InternalServerError`.
fn error_name(status: StatusCode) -> String {
    let reason = status.canonical_reason().unwrap_or("Unknown");
    let mut name: String = reason
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect();
    if !name.ends_with("Error") {
        name.push_str("Error");
    }
    name
}
