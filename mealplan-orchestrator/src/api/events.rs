//! Job progress feed
//!
//! Server-Sent Events view of one job's change feed.

use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::sse::{Event as SseEvent, KeepAlive, Sse},
};
use chrono::Utc;
use futures::{Stream, StreamExt};
use mealplan_core::dto::job::JOB_UPDATE_EVENT;
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::api::owner::Owner;
use crate::service::{job_service, reclaimer};
use crate::state::AppState;

/// GET /job/{id}/events
/// Stream the job's current state followed by every change until it ends
/// or goes stale
pub async fn job_events(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<Uuid>,
) -> ApiResult<Sse<impl Stream<Item = Result<SseEvent, axum::Error>>>> {
    // Subscribe before reading so no write in between is missed
    let receiver = state.events.subscribe();
    let job = job_service::get_job(state.jobs.as_ref(), owner, id).await?;
    let stale_after = state.config.stale_after();
    let job = reclaimer::reclaim_if_stale(
        state.jobs.as_ref(),
        &state.events,
        job,
        Utc::now(),
        stale_after,
    )
    .await?;

    tracing::debug!("Streaming events for job {} ({})", id, job.status);

    let feed = reclaimer::watch_job(
        state.jobs.clone(),
        state.events.clone(),
        job,
        receiver,
        stale_after,
    );
    let stream = feed.map(|update| {
        SseEvent::default()
            .event(JOB_UPDATE_EVENT)
            .id(update.updated_at.timestamp_millis().to_string())
            .json_data(&update)
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}
