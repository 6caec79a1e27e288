//! Submission Service
//!
//! Validates a request, applies the advisory duplicate check, resolves
//! containers, persists the job and hands it to the dispatcher.

use chrono::Utc;
use mealplan_core::domain::job::{Job, JobStatus, JobTarget, TargetError};
use mealplan_core::dto::job::{PendingQuery, SubmitJob, SubmitJobResponse};
use uuid::Uuid;

use crate::config::DuplicatePolicy;
use crate::repository::StoreError;
use crate::service::reclaimer;
use crate::service::slot_resolver::{self, ResolveError};
use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    InvalidTarget(#[from] TargetError),
    #[error("job {existing} is already generating an overlapping target")]
    Duplicate { existing: Uuid },
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Submit a new generation job
///
/// Validates the target, checks for overlapping active jobs, resolves the
/// plan containers, stores the job as pending and hands it to the dispatcher.
/// Returns as soon as the row exists; the worker runs in the background.
///
/// # Arguments
/// * `state` - Shared application state
/// * `owner` - Owner the job and its containers belong to
/// * `req` - Mode, target and constraints of the job
///
/// # Returns
/// The new job's id, plus the overlapping job's id when duplicates are allowed
///
/// # Errors
/// `InvalidTarget` for malformed targets, `Duplicate` when an overlapping
/// job is active and the policy rejects duplicates
pub async fn submit(
    state: &AppState,
    owner: Uuid,
    req: SubmitJob,
) -> Result<SubmitJobResponse, SubmitError> {
    req.target.validate_for(req.mode)?;

    let now = Utc::now();

    // Goes through the reclaimer so stale jobs never block a resubmission
    let pending = reclaimer::list_active(
        state.jobs.as_ref(),
        &state.events,
        owner,
        &PendingQuery::default(),
        now,
        state.config.stale_after(),
    )
    .await?;

    let duplicate_of = find_overlap(&pending.active, &req.target);
    if let Some(existing) = duplicate_of {
        match state.config.duplicate_policy {
            DuplicatePolicy::Reject => {
                tracing::info!("Rejected job for owner {}: overlaps job {}", owner, existing);
                return Err(SubmitError::Duplicate { existing });
            }
            DuplicatePolicy::Allow => {
                tracing::warn!("Accepting job for owner {} that overlaps job {}", owner, existing);
            }
        }
    }

    let containers = slot_resolver::resolve(state.plans.as_ref(), owner, &req.target, now).await?;
    let job = Job::new(owner, req.mode, req.target, req.constraints, containers, now);

    state.jobs.insert(&job).await?;

    tracing::info!(
        "Job created: {} ({} mode, {} slots) for owner {}",
        job.id,
        job.mode,
        job.target.slots().len(),
        owner
    );

    state.events.publish(&job);
    state.dispatcher.dispatch(&job);

    Ok(SubmitJobResponse {
        job_id: job.id,
        status: JobStatus::Pending,
        duplicate_of,
    })
}

/// First active job sharing a slot with `target`
pub fn find_overlap(active: &[Job], target: &JobTarget) -> Option<Uuid> {
    active
        .iter()
        .find(|job| job.target.overlaps(target))
        .map(|job| job.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, StorageBackend};
    use crate::repository::JobStore;
    use chrono::NaiveDate;
    use mealplan_core::domain::job::{Constraints, JobMode};
    use mealplan_core::domain::slot::{MealType, SlotRef};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn active_job(target: JobTarget) -> Job {
        Job::new(
            Uuid::new_v4(),
            JobMode::Weekly,
            target,
            Constraints::default(),
            vec![],
            Utc::now(),
        )
    }

    #[test]
    fn test_overlap_detects_shared_slot_only() {
        let week = active_job(JobTarget::Week {
            start_date: date(2025, 6, 2),
            meal_types: vec![MealType::Dinner],
        });
        let active = vec![week.clone()];

        let dinner = JobTarget::Slot(SlotRef::new(date(2025, 6, 4), MealType::Dinner));
        let lunch = JobTarget::Slot(SlotRef::new(date(2025, 6, 4), MealType::Lunch));
        let next_week = JobTarget::Slot(SlotRef::new(date(2025, 6, 9), MealType::Dinner));

        assert_eq!(find_overlap(&active, &dinner), Some(week.id));
        assert_eq!(find_overlap(&active, &lunch), None);
        assert_eq!(find_overlap(&active, &next_week), None);
    }

    #[tokio::test]
    async fn test_invalid_target_writes_nothing() {
        let config = Config::new("http://127.0.0.1:9".to_string(), StorageBackend::Memory);
        let (state, store) = AppState::in_memory(config).unwrap();
        let owner = Uuid::new_v4();

        let err = submit(
            &state,
            owner,
            SubmitJob {
                mode: JobMode::MultiSlot,
                target: JobTarget::Slots { slots: vec![] },
                constraints: Constraints::default(),
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, SubmitError::InvalidTarget(TargetError::EmptySlots)));
        assert!(store.find_active(owner).await.unwrap().is_empty());
        assert_eq!(state.dispatcher.in_flight(), 0);
    }
}
