//! Generation API Handlers

use axum::{Json, extract::State};
use mealplan_core::domain::job::{JobMode, JobStatus};
use mealplan_core::dto::worker::{WorkerInvocation, WorkerResponse};

use super::error::{ApiError, ApiResult};
use crate::state::WorkerState;

/// POST /generate/single
pub async fn generate_single(
    State(state): State<WorkerState>,
    Json(invocation): Json<WorkerInvocation>,
) -> ApiResult<Json<WorkerResponse>> {
    generate(state, JobMode::Single, invocation).await
}

/// POST /generate/weekly
pub async fn generate_weekly(
    State(state): State<WorkerState>,
    Json(invocation): Json<WorkerInvocation>,
) -> ApiResult<Json<WorkerResponse>> {
    generate(state, JobMode::Weekly, invocation).await
}

/// POST /generate/multi-slot
pub async fn generate_multi_slot(
    State(state): State<WorkerState>,
    Json(invocation): Json<WorkerInvocation>,
) -> ApiResult<Json<WorkerResponse>> {
    generate(state, JobMode::MultiSlot, invocation).await
}

/// POST /generate/regenerate
pub async fn generate_regenerate(
    State(state): State<WorkerState>,
    Json(invocation): Json<WorkerInvocation>,
) -> ApiResult<Json<WorkerResponse>> {
    generate(state, JobMode::Regenerate, invocation).await
}

async fn generate(
    state: WorkerState,
    route: JobMode,
    invocation: WorkerInvocation,
) -> ApiResult<Json<WorkerResponse>> {
    if invocation.mode != route {
        return Err(ApiError::BadRequest(format!(
            "job {} is a {} job, not {}",
            invocation.job_id, invocation.mode, route
        )));
    }

    invocation
        .target
        .validate_for(invocation.mode)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let response = state.generation.run(invocation).await;

    match response.status {
        JobStatus::Completed => Ok(Json(response)),
        _ => Err(ApiError::GenerationFailed(response)),
    }
}
