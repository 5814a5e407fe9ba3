use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed taxonomy of domain failures. Every kind maps to exactly one HTTP
/// status and one machine-readable exception token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Constraint,
    ContentAlreadyExists,
    InvalidFilter,
    InvalidArgument,
    IllegalState,
    NameConstraint,
    NotSupported,
    ObjectNotFound,
    PermissionDenied,
    Storage,
    StreamNotSupported,
    UpdateConflict,
    Versioning,
    Runtime,
}

impl ErrorKind {
    /// Total mapping from error kind to transport status code.
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::Constraint
            | ErrorKind::ContentAlreadyExists
            | ErrorKind::NameConstraint
            | ErrorKind::UpdateConflict
            | ErrorKind::Versioning => StatusCode::CONFLICT,
            ErrorKind::InvalidFilter | ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorKind::NotSupported => StatusCode::METHOD_NOT_ALLOWED,
            ErrorKind::ObjectNotFound => StatusCode::NOT_FOUND,
            ErrorKind::PermissionDenied | ErrorKind::StreamNotSupported => StatusCode::FORBIDDEN,
            ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
            // Everything else, IllegalState and generic runtime included.
            ErrorKind::IllegalState | ErrorKind::Runtime => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Wire-level exception token. IllegalState has no protocol name of its
    /// own and is reported as a runtime failure.
    pub fn exception_name(&self) -> &'static str {
        match self {
            ErrorKind::Constraint => "constraint",
            ErrorKind::ContentAlreadyExists => "contentAlreadyExists",
            ErrorKind::InvalidFilter => "filterNotValid",
            ErrorKind::InvalidArgument => "invalidArgument",
            ErrorKind::NameConstraint => "nameConstraintViolation",
            ErrorKind::NotSupported => "notSupported",
            ErrorKind::ObjectNotFound => "objectNotFound",
            ErrorKind::PermissionDenied => "permissionDenied",
            ErrorKind::Storage => "storage",
            ErrorKind::StreamNotSupported => "streamNotSupported",
            ErrorKind::UpdateConflict => "updateConflict",
            ErrorKind::Versioning => "versioning",
            ErrorKind::IllegalState | ErrorKind::Runtime => "runtime",
        }
    }

    /// Runtime-classified failures are logged at error severity; structured
    /// domain failures are not.
    pub fn is_runtime(&self) -> bool {
        matches!(self, ErrorKind::Runtime | ErrorKind::IllegalState)
    }
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CmisError {
    kind: ErrorKind,
    message: String,
    trace: Option<String>,
}

impl CmisError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            trace: None,
        }
    }

    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    pub fn constraint(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Constraint, message)
    }

    pub fn content_already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ContentAlreadyExists, message)
    }

    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidFilter, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IllegalState, message)
    }

    pub fn name_constraint(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NameConstraint, message)
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotSupported, message)
    }

    pub fn object_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ObjectNotFound, message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PermissionDenied, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    pub fn stream_not_supported(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StreamNotSupported, message)
    }

    pub fn update_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UpdateConflict, message)
    }

    pub fn versioning(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Versioning, message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Runtime, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    pub fn exception_name(&self) -> &'static str {
        self.kind.exception_name()
    }

    pub fn trace(&self) -> Option<&str> {
        self.trace.as_deref()
    }
}

impl From<serde_json::Error> for CmisError {
    fn from(err: serde_json::Error) -> Self {
        CmisError::runtime(format!("JSON error: {}", err))
    }
}

/// Structured error body written to the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub exception: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<String>,
}

/// Memoized result of a failed operation, retrievable through the
/// `lastResult` selector without re-executing the operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub code: u16,
    pub exception: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<String>,
}

impl ErrorRecord {
    pub fn from_error(err: &CmisError) -> Self {
        Self {
            code: err.status().as_u16(),
            exception: err.exception_name().to_string(),
            message: err.message().to_string(),
            stacktrace: err.trace().map(str::to_string),
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            exception: self.exception.clone(),
            message: self.message.clone(),
            stacktrace: self.stacktrace.clone(),
        }
    }
}

/// Common prefix of all last-result session keys.
pub const LAST_RESULT_PREFIX: &str = "cmis.lastResult.";

/// Session attribute key under which the last result for a
/// (repository, transaction) pair is stored.
pub fn last_result_key(repository_id: &str, transaction: &str) -> String {
    format!("{}{}.{}", LAST_RESULT_PREFIX, repository_id, transaction)
}
