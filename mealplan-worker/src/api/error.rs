//! API Error Handling

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mealplan_core::dto::worker::WorkerResponse;
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    /// The invocation cannot be run at all; the job is left to the dispatcher
    BadRequest(String),
    /// The job ran and ended failed
    GenerationFailed(WorkerResponse),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::GenerationFailed(response) => {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(response)).into_response()
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
