//! Error types for songstep-gen
//!
//! `CoreError` is the normalized failure every core operation resolves to.
//! `ApiError` wraps it for HTTP handlers and renders a structured body with
//! a machine-readable code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Machine-readable error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// No response obtained (connect, timeout, DNS)
    TransportFailure,
    /// Upstream answered with a non-2xx status or an application error body
    UpstreamRejected,
    /// Upstream answered 2xx with an unparseable or unexpected body
    UpstreamMalformed,
    /// Caller-supplied identifier or parameter failed a format check
    ValidationError,
    /// Resolved asset path falls outside the store root
    PathEscape,
    /// Well-formed request, no matching resource
    NotFound,
    /// History commit attempted before every slot is terminal
    IncompleteSession,
    /// Required credential missing from the deployment configuration
    NotConfigured,
    /// Local filesystem or serialization fault
    StorageError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TransportFailure => "TRANSPORT_FAILURE",
            ErrorKind::UpstreamRejected => "UPSTREAM_REJECTED",
            ErrorKind::UpstreamMalformed => "UPSTREAM_MALFORMED",
            ErrorKind::ValidationError => "VALIDATION_ERROR",
            ErrorKind::PathEscape => "PATH_ESCAPE",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::IncompleteSession => "INCOMPLETE_SESSION",
            ErrorKind::NotConfigured => "NOT_CONFIGURED",
            ErrorKind::StorageError => "STORAGE_ERROR",
        }
    }
}

/// Normalized core failure
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("Upstream transport failed: {0}")]
    TransportFailure(String),

    #[error("Upstream rejected request with status {status}: {body}")]
    UpstreamRejected { status: u16, body: String },

    #[error("Upstream returned an unexpected body: {0}")]
    UpstreamMalformed(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Path escapes store root: {0}")]
    PathEscape(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Session {0} has pending artifacts; history not saved")]
    IncompleteSession(String),

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::TransportFailure(_) => ErrorKind::TransportFailure,
            CoreError::UpstreamRejected { .. } => ErrorKind::UpstreamRejected,
            CoreError::UpstreamMalformed(_) => ErrorKind::UpstreamMalformed,
            CoreError::Validation(_) => ErrorKind::ValidationError,
            CoreError::PathEscape(_) => ErrorKind::PathEscape,
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::IncompleteSession(_) => ErrorKind::IncompleteSession,
            CoreError::NotConfigured(_) => ErrorKind::NotConfigured,
            CoreError::Storage(_) => ErrorKind::StorageError,
        }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Storage(format!("JSON: {}", err))
    }
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Normalized core failure
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Invalid request body or missing parameter (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

fn status_for(err: &CoreError) -> StatusCode {
    match err {
        CoreError::Validation(_) => StatusCode::BAD_REQUEST,
        CoreError::PathEscape(_) => StatusCode::FORBIDDEN,
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::IncompleteSession(_) => StatusCode::CONFLICT,
        CoreError::UpstreamRejected { status, .. } => StatusCode::from_u16(*status)
            .ok()
            .filter(|s| s.is_client_error() || s.is_server_error())
            .unwrap_or(StatusCode::BAD_GATEWAY),
        CoreError::UpstreamMalformed(_) | CoreError::TransportFailure(_) => {
            StatusCode::BAD_GATEWAY
        }
        CoreError::NotConfigured(_) | CoreError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Core(err) => {
                let status = status_for(&err);
                let mut error = json!({
                    "code": err.kind().as_str(),
                    "message": err.to_string(),
                });
                if let CoreError::UpstreamRejected { status: upstream, body } = &err {
                    error["upstream_status"] = json!(upstream);
                    error["details"] = serde_json::from_str(body)
                        .unwrap_or_else(|_| json!(body));
                }
                (status, json!({ "error": error }))
            }
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": { "code": "BAD_REQUEST", "message": msg } }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
