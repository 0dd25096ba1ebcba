use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::awards::DirectoryError;
use crate::workflows::terms::TermServiceError;
use crate::workflows::RepositoryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

/// Stable, machine-readable failure classes surfaced to API callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Unauthenticated,
    ActorNotEligible,
    NotFound,
    Conflict,
    RegistrationClosed,
    StorageFailure,
    PersistenceFailure,
    Internal,
}

impl ErrorKind {
    pub const fn label(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::ActorNotEligible => "actor_not_eligible",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::RegistrationClosed => "registration_closed",
            ErrorKind::StorageFailure => "storage_failure",
            ErrorKind::PersistenceFailure => "persistence_failure",
            ErrorKind::Internal => "internal_error",
        }
    }

    pub const fn status(self) -> StatusCode {
        match self {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorKind::ActorNotEligible => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::RegistrationClosed => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::StorageFailure
            | ErrorKind::PersistenceFailure
            | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<&RepositoryError> for ErrorKind {
    fn from(err: &RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => ErrorKind::NotFound,
            RepositoryError::Conflict(_) | RepositoryError::InUse(_) => ErrorKind::Conflict,
            RepositoryError::Unavailable(_) => ErrorKind::PersistenceFailure,
        }
    }
}

/// JSON error body shared by every router: `{"error": <message>, "kind": <kind>}`.
pub fn error_response(kind: ErrorKind, message: impl Into<String>) -> Response {
    let body = Json(json!({
        "error": message.into(),
        "kind": kind.label(),
    }));
    (kind.status(), body).into_response()
}

/// Malformed path, query string or JSON body, reported with the extractor's own message.
pub fn rejected(body_text: String) -> Response {
    error_response(ErrorKind::Validation, body_text)
}

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Repository(RepositoryError),
    Term(TermServiceError),
    Directory(DirectoryError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Repository(err) => write!(f, "database error: {}", err),
            AppError::Term(err) => write!(f, "term error: {}", err),
            AppError::Directory(err) => write!(f, "actor directory error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Repository(err) => Some(err),
            AppError::Term(err) => Some(err),
            AppError::Directory(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = match &self {
            AppError::Term(err) => err.kind(),
            AppError::Repository(err) => ErrorKind::from(err),
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Directory(_) => ErrorKind::Internal,
        };

        error_response(kind, self.to_string())
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<RepositoryError> for AppError {
    fn from(value: RepositoryError) -> Self {
        Self::Repository(value)
    }
}

impl From<TermServiceError> for AppError {
    fn from(value: TermServiceError) -> Self {
        Self::Term(value)
    }
}

impl From<DirectoryError> for AppError {
    fn from(value: DirectoryError) -> Self {
        Self::Directory(value)
    }
}
