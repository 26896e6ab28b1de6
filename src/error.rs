use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::dao::{
    gateway::GatewayError,
    models::ScheduleViolation,
    schedule_store::ReplaceError,
    storage::StorageError,
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Durable write or read failed; prior durable state is intact.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// The access gate denied the caller.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// The incoming schedule violates the ordering/overlap invariant.
    #[error("invalid schedule: {0}")]
    InvalidSchedule(#[source] ScheduleViolation),
    /// Whole-document replacement raced a newer commit.
    #[error("stale schedule version: current {current}, attempted {attempted}")]
    StaleVersion {
        /// Version currently held.
        current: u64,
        /// Version the caller based its edit on.
        attempted: u64,
    },
    /// Rollback target absent from the commit log.
    #[error("unknown commit version {requested} (latest is {latest})")]
    UnknownVersion {
        /// Version the caller asked for.
        requested: u64,
        /// Most recent version the log holds.
        latest: u64,
    },
    /// Local and remote histories disagree; requires manual resolution.
    #[error("local and remote histories diverge at version {version}")]
    DivergedHistory {
        /// First version at which the histories disagree.
        version: u64,
    },
    /// Operation exceeded its timeout limit.
    #[error("operation timed out")]
    Timeout,
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<GatewayError> for ServiceError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Replace(ReplaceError::Invalid(violation)) => {
                ServiceError::InvalidSchedule(violation)
            }
            GatewayError::Replace(ReplaceError::Stale { current, attempted }) => {
                ServiceError::StaleVersion { current, attempted }
            }
            GatewayError::UnknownVersion { requested, latest } => {
                ServiceError::UnknownVersion { requested, latest }
            }
            GatewayError::DivergedHistory { version } => ServiceError::DivergedHistory { version },
            GatewayError::Storage(source) => ServiceError::Unavailable(source),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::InvalidSchedule(violation) => {
                AppError::BadRequest(format!("invalid schedule: {violation}"))
            }
            err @ ServiceError::StaleVersion { .. } => AppError::Conflict(err.to_string()),
            err @ ServiceError::UnknownVersion { .. } => AppError::NotFound(err.to_string()),
            err @ ServiceError::DivergedHistory { .. } => AppError::Conflict(err.to_string()),
            ServiceError::Timeout => AppError::ServiceUnavailable("operation timed out".into()),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
