//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::repository::StoreError;
use crate::service::job_service::JobError;
use crate::service::slot_resolver::ResolveError;
use crate::service::submission_service::SubmitError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    /// The request lost against another job; `existing` names it when known
    Conflict {
        message: String,
        existing: Option<Uuid>,
    },
    StoreError(StoreError),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, error_body(msg)),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, error_body(msg)),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, error_body(msg)),
            ApiError::Conflict { message, existing } => {
                let mut body = error_body(message);
                if let Some(existing) = existing {
                    body["existing_job_id"] = serde_json::json!(existing);
                }
                (StatusCode::CONFLICT, body)
            }
            ApiError::StoreError(err) => {
                tracing::error!("Store error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_body("Internal server error".to_string()),
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_body("Internal server error".to_string()),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

fn error_body(message: String) -> serde_json::Value {
    serde_json::json!({ "error": message })
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::StoreError(err)
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::NotFound(id) => ApiError::NotFound(format!("Job {} not found", id)),
            JobError::AlreadyTerminal { .. } => ApiError::Conflict {
                message: err.to_string(),
                existing: None,
            },
            JobError::Validation(msg) => ApiError::BadRequest(msg),
            JobError::Store(err) => ApiError::StoreError(err),
        }
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Store(err) => ApiError::StoreError(err),
            ResolveError::DateOutOfRange(_) => ApiError::BadRequest(err.to_string()),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::InvalidTarget(e) => ApiError::BadRequest(e.to_string()),
            SubmitError::Duplicate { existing } => ApiError::Conflict {
                message: err.to_string(),
                existing: Some(existing),
            },
            SubmitError::Resolve(e) => e.into(),
            SubmitError::Store(e) => ApiError::StoreError(e),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
