//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod events;
pub mod health;
pub mod job;
pub mod owner;
pub mod plan;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Client endpoints
        .route("/job/submit", post(job::submit_job))
        .route("/job/pending", get(job::list_pending_jobs))
        .route("/job/{id}", get(job::get_job))
        .route("/job/{id}/events", get(events::job_events))
        .route("/plan/day/{date}", get(plan::get_day_plan))
        // Worker callbacks
        .route("/job/{id}/progress", post(job::report_progress))
        .route("/job/{id}/complete", post(job::complete_job))
        .route("/job/{id}/fail", post(job::fail_job))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
