//! Job Service
//!
//! Business logic for reading jobs and applying the worker's lifecycle
//! writes. Each successful write is published to the change feed.

use chrono::Utc;
use mealplan_core::domain::job::{Job, JobProgress, JobResult, JobStatus};
use mealplan_core::domain::slot::Slot;
use mealplan_core::dto::job::{CompleteJob, FailJob};
use std::collections::HashSet;
use uuid::Uuid;

use crate::repository::{JobStore, MealWrite, StoreError};
use crate::service::notifier::JobEvents;

/// Service error type
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("job {0} not found")]
    NotFound(Uuid),
    #[error("job {id} is already {status}")]
    AlreadyTerminal { id: Uuid, status: JobStatus },
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Get a job by ID, scoped to its owner
pub async fn get_job(jobs: &dyn JobStore, owner: Uuid, id: Uuid) -> Result<Job, JobError> {
    jobs.find(id)
        .await?
        .filter(|job| job.owner == owner)
        .ok_or(JobError::NotFound(id))
}

/// Record worker progress, moving the job to processing
pub async fn record_progress(
    jobs: &dyn JobStore,
    events: &JobEvents,
    owner: Uuid,
    id: Uuid,
    progress: JobProgress,
) -> Result<Job, JobError> {
    if progress.done > progress.total {
        return Err(JobError::Validation(format!(
            "progress {}/{} exceeds its total",
            progress.done, progress.total
        )));
    }

    ensure_active(jobs, owner, id).await?;

    match jobs.record_progress(id, &progress, Utc::now()).await? {
        Some(job) => {
            tracing::debug!("Job {} progress {}/{}", id, progress.done, progress.total);
            events.publish(&job);
            Ok(job)
        }
        None => Err(terminal_conflict(jobs, id).await),
    }
}

/// Store the generated meals and complete the job in one write
///
/// The meals must cover exactly the job's target slots; anything else is
/// rejected before the store is touched. Each meal lands in the day container
/// resolved at submission, replacing whatever that slot held.
///
/// # Arguments
/// * `jobs` - Job store
/// * `events` - Change feed the completed row is published to
/// * `owner` - Owner the job must belong to
/// * `id` - The job ID
/// * `req` - One generated meal per target slot
///
/// # Returns
/// The completed job
///
/// # Errors
/// `AlreadyTerminal` if the job finished or was reclaimed first, and
/// `Validation` when the meals do not match the target slots
pub async fn complete_job(
    jobs: &dyn JobStore,
    events: &JobEvents,
    owner: Uuid,
    id: Uuid,
    req: CompleteJob,
) -> Result<Job, JobError> {
    let job = ensure_active(jobs, owner, id).await?;
    let writes = plan_writes(&job, &req)?;
    let result = JobResult { meals: req.meals };

    match jobs.complete(id, &result, &writes, Utc::now()).await? {
        Some(job) => {
            tracing::info!("Job {} completed with {} meals", id, writes.len());
            events.publish(&job);
            Ok(job)
        }
        None => Err(terminal_conflict(jobs, id).await),
    }
}

/// Fail a job on behalf of its worker
pub async fn fail_job(
    jobs: &dyn JobStore,
    events: &JobEvents,
    owner: Uuid,
    id: Uuid,
    req: FailJob,
) -> Result<Job, JobError> {
    ensure_active(jobs, owner, id).await?;

    match mark_failed(jobs, events, id, &req.error_message).await? {
        Some(job) => Ok(job),
        None => Err(terminal_conflict(jobs, id).await),
    }
}

/// Fail a job if it is still active, publishing the change
///
/// Used by paths without an owner context, such as the dispatcher.
pub async fn mark_failed(
    jobs: &dyn JobStore,
    events: &JobEvents,
    id: Uuid,
    message: &str,
) -> Result<Option<Job>, StoreError> {
    let job = jobs.fail(id, message, Utc::now()).await?;

    if let Some(job) = &job {
        tracing::info!("Job {} failed: {}", id, message);
        events.publish(job);
    }

    Ok(job)
}

async fn ensure_active(jobs: &dyn JobStore, owner: Uuid, id: Uuid) -> Result<Job, JobError> {
    let job = get_job(jobs, owner, id).await?;
    if job.status.is_terminal() {
        return Err(JobError::AlreadyTerminal {
            id,
            status: job.status,
        });
    }
    Ok(job)
}

/// Explains why a conditional write matched no row
async fn terminal_conflict(jobs: &dyn JobStore, id: Uuid) -> JobError {
    match jobs.find(id).await {
        Ok(Some(job)) => {
            tracing::warn!("Dropped late write to job {} ({})", id, job.status);
            JobError::AlreadyTerminal {
                id,
                status: job.status,
            }
        }
        Ok(None) => JobError::NotFound(id),
        Err(e) => JobError::Store(e),
    }
}

/// Maps each generated meal onto its day container
fn plan_writes(job: &Job, req: &CompleteJob) -> Result<Vec<MealWrite>, JobError> {
    let expected: HashSet<Slot> = job.target.slots().into_iter().collect();
    let mut seen = HashSet::new();
    let mut writes = Vec::with_capacity(req.meals.len());

    for generated in &req.meals {
        let slot = generated.slot();
        if !expected.contains(&slot) {
            return Err(JobError::Validation(format!(
                "slot {} is outside the job target",
                slot
            )));
        }
        if !seen.insert(slot) {
            return Err(JobError::Validation(format!("slot {} written twice", slot)));
        }

        let day = job.day_ref(slot.date).ok_or_else(|| {
            JobError::Validation(format!("no day container for {}", slot.date))
        })?;

        writes.push(MealWrite {
            day_id: day.day_id,
            meal_type: slot.meal_type,
            meal: generated.meal.clone(),
        });
    }

    if seen.len() != expected.len() {
        let mut missing: Vec<Slot> = expected.difference(&seen).copied().collect();
        missing.sort();
        let missing: Vec<String> = missing.iter().map(ToString::to_string).collect();
        return Err(JobError::Validation(format!(
            "missing slots: {}",
            missing.join(", ")
        )));
    }

    Ok(writes)
}
