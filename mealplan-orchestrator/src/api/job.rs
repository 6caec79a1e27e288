//! Job API Handlers
//!
//! HTTP endpoints for submitting jobs, reading them, and the worker's
//! lifecycle callbacks.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use mealplan_core::domain::job::{Job, JobProgress};
use mealplan_core::dto::job::{CompleteJob, FailJob, PendingJobs, PendingQuery, SubmitJob, SubmitJobResponse};
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::api::owner::Owner;
use crate::service::reclaimer;
use crate::service::{job_service, submission_service};
use crate::state::AppState;

// =============================================================================
// Client Endpoints
// =============================================================================

/// POST /job/submit
/// Accept a generation request and dispatch it in the background
pub async fn submit_job(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Json(req): Json<SubmitJob>,
) -> ApiResult<(StatusCode, Json<SubmitJobResponse>)> {
    tracing::info!("Submitting {} job for owner {}", req.mode, owner);

    let response = submission_service::submit(&state, owner, req).await?;

    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// GET /job/pending
/// List active jobs, failing any that went stale
pub async fn list_pending_jobs(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Query(query): Query<PendingQuery>,
) -> ApiResult<Json<PendingJobs>> {
    tracing::debug!("Listing pending jobs for owner {}", owner);

    let pending = reclaimer::list_active(
        state.jobs.as_ref(),
        &state.events,
        owner,
        &query,
        Utc::now(),
        state.config.stale_after(),
    )
    .await?;

    Ok(Json(pending))
}

/// GET /job/{id}
/// Get job details by ID, failing it first if it went stale
pub async fn get_job(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Job>> {
    tracing::debug!("Getting job: {}", id);

    let job = job_service::get_job(state.jobs.as_ref(), owner, id).await?;
    let job = reclaimer::reclaim_if_stale(
        state.jobs.as_ref(),
        &state.events,
        job,
        Utc::now(),
        state.config.stale_after(),
    )
    .await?;

    Ok(Json(job))
}

// =============================================================================
// Worker Callbacks
// =============================================================================

/// POST /job/{id}/progress
pub async fn report_progress(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<Uuid>,
    Json(progress): Json<JobProgress>,
) -> ApiResult<StatusCode> {
    job_service::record_progress(state.jobs.as_ref(), &state.events, owner, id, progress).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /job/{id}/complete
/// Store the generated meals and mark the job completed, atomically
pub async fn complete_job(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<Uuid>,
    Json(req): Json<CompleteJob>,
) -> ApiResult<StatusCode> {
    tracing::info!("Completing job {} with {} meals", id, req.meals.len());

    job_service::complete_job(state.jobs.as_ref(), &state.events, owner, id, req).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /job/{id}/fail
pub async fn fail_job(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<Uuid>,
    Json(req): Json<FailJob>,
) -> ApiResult<StatusCode> {
    job_service::fail_job(state.jobs.as_ref(), &state.events, owner, id, req).await?;

    Ok(StatusCode::NO_CONTENT)
}
