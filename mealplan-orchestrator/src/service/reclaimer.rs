//! Stale Reclaimer
//!
//! Runs inside every read that reports a job as active: the pending-jobs
//! list, single-job reads and the change feed. Active jobs whose last update
//! is older than the stale timeout are failed before anyone sees them.

use std::sync::Arc;

use async_stream::stream;
use chrono::{DateTime, Duration, Utc};
use futures::{Stream, StreamExt};
use mealplan_core::domain::job::{FailureReason, Job};
use mealplan_core::dto::job::{JobUpdate, PendingJobs, PendingQuery};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::repository::{JobStore, StoreError};
use crate::service::notifier::{JobEvents, job_stream};

/// Splits active jobs into `(fresh, stale)`
pub fn partition_stale(jobs: Vec<Job>, now: DateTime<Utc>, timeout: Duration) -> (Vec<Job>, Vec<Job>) {
    jobs.into_iter().partition(|job| !job.is_stale(now, timeout))
}

/// Lists an owner's active jobs matching `query`, reclaiming stale ones
///
/// Stale candidates are failed with `stale_request_timeout` in one batch
/// write. Only rows that write actually moved are reported as reclaimed; a
/// job whose worker finished in the meantime keeps its terminal state.
///
/// # Arguments
/// * `jobs` - Job store
/// * `events` - Change feed the reclaimed rows are published to
/// * `owner` - Owner whose jobs are listed
/// * `query` - Date range and mode filter
/// * `now` - Reference time for the staleness check
/// * `timeout` - How long an active job may stay quiet
///
/// # Returns
/// The still-active jobs and the ids reclaimed by this call
pub async fn list_active(
    jobs: &dyn JobStore,
    events: &JobEvents,
    owner: Uuid,
    query: &PendingQuery,
    now: DateTime<Utc>,
    timeout: Duration,
) -> Result<PendingJobs, StoreError> {
    let candidates: Vec<Job> = jobs
        .find_active(owner)
        .await?
        .into_iter()
        .filter(|job| query.matches(job))
        .collect();

    let (active, stale) = partition_stale(candidates, now, timeout);

    let mut reclaimed = Vec::new();
    if !stale.is_empty() {
        let ids: Vec<Uuid> = stale.iter().map(|job| job.id).collect();
        let failed = jobs
            .fail_many(&ids, FailureReason::StaleRequestTimeout.tag(), now)
            .await?;

        for job in &failed {
            tracing::warn!("Reclaimed stale job {} ({} mode)", job.id, job.mode);
            events.publish(job);
            reclaimed.push(job.id);
        }
    }

    Ok(PendingJobs { active, reclaimed })
}

/// Fails `job` if it has gone stale, returning the row callers should see
pub async fn reclaim_if_stale(
    jobs: &dyn JobStore,
    events: &JobEvents,
    job: Job,
    now: DateTime<Utc>,
    timeout: Duration,
) -> Result<Job, StoreError> {
    if !job.is_stale(now, timeout) {
        return Ok(job);
    }

    match jobs
        .fail(job.id, FailureReason::StaleRequestTimeout.tag(), now)
        .await?
    {
        Some(failed) => {
            tracing::warn!("Reclaimed stale job {} ({} mode)", failed.id, failed.mode);
            events.publish(&failed);
            Ok(failed)
        }
        // Another write won the race; report whatever it left
        None => Ok(jobs.find(job.id).await?.unwrap_or(job)),
    }
}

/// Change feed for one job that cannot outlive its stale timeout
///
/// Follows `job_stream`; if that ends on a quiet job, the row is re-read and
/// reclaimed, and the resulting terminal update closes the feed.
pub fn watch_job(
    jobs: Arc<dyn JobStore>,
    events: JobEvents,
    current: Job,
    receiver: broadcast::Receiver<JobUpdate>,
    timeout: Duration,
) -> impl Stream<Item = JobUpdate> {
    stream! {
        let id = current.id;
        let mut finished = current.status.is_terminal();

        let updates = job_stream(current, receiver, timeout);
        futures::pin_mut!(updates);
        while let Some(update) = updates.next().await {
            finished = update.is_terminal();
            yield update;
        }

        if !finished {
            let reread = match jobs.find(id).await {
                Ok(Some(job)) => {
                    reclaim_if_stale(jobs.as_ref(), &events, job, Utc::now(), timeout)
                        .await
                        .map(Some)
                }
                Ok(None) => Ok(None),
                Err(e) => Err(e),
            };

            match reread {
                Ok(Some(job)) if job.status.is_terminal() => yield JobUpdate::from(&job),
                Ok(_) => {}
                Err(e) => tracing::warn!("Failed to re-read job {} after its feed ended: {}", id, e),
            }
        }
    }
}
