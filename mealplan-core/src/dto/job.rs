//! Job DTOs for inter-service communication

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::job::{
    Constraints, GeneratedMeal, Job, JobMode, JobProgress, JobResult, JobStatus, JobTarget,
};

/// Request to submit a new generation job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJob {
    pub mode: JobMode,
    pub target: JobTarget,
    #[serde(default)]
    pub constraints: Constraints,
}

/// Immediate acknowledgement of a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitJobResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    /// Active job with an overlapping target, when duplicates are allowed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<Uuid>,
}

/// Filter for the pending-jobs listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PendingQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<JobMode>,
}

impl PendingQuery {
    pub fn matches(&self, job: &Job) -> bool {
        self.mode.is_none_or(|mode| job.mode == mode)
            && job.target.intersects_range(self.from, self.to)
    }
}

/// Active jobs after stale reclamation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingJobs {
    pub active: Vec<Job>,
    /// Jobs this read moved to failed because they went stale
    #[serde(default)]
    pub reclaimed: Vec<Uuid>,
}

/// Worker report of successful generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteJob {
    pub meals: Vec<GeneratedMeal>,
}

/// Worker report of a failed generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailJob {
    pub error_message: String,
}

/// SSE event name carrying a serialized `JobUpdate`
pub const JOB_UPDATE_EVENT: &str = "job_update";

/// Change-feed event emitted on every write to a job row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobUpdate {
    pub job_id: Uuid,
    pub owner: Uuid,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<JobProgress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl JobUpdate {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

impl From<&Job> for JobUpdate {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id,
            owner: job.owner,
            status: job.status,
            progress: job.progress.clone(),
            result: job.result.clone(),
            error_message: job.error_message.clone(),
            updated_at: job.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::slot::{MealType, SlotRef};

    fn job_on(date: NaiveDate, mode: JobMode) -> Job {
        Job::new(
            Uuid::new_v4(),
            mode,
            JobTarget::Slot(SlotRef::new(date, MealType::Dinner)),
            Constraints::default(),
            vec![],
            Utc::now(),
        )
    }

    #[test]
    fn test_pending_query_filters_mode_and_range() {
        let june_1 = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let job = job_on(june_1, JobMode::Single);

        assert!(PendingQuery::default().matches(&job));
        assert!(
            PendingQuery {
                from: Some(june_1),
                to: Some(june_1),
                mode: Some(JobMode::Single),
            }
            .matches(&job)
        );
        assert!(
            !PendingQuery {
                mode: Some(JobMode::Weekly),
                ..Default::default()
            }
            .matches(&job)
        );
        assert!(
            !PendingQuery {
                from: NaiveDate::from_ymd_opt(2025, 6, 2),
                ..Default::default()
            }
            .matches(&job)
        );
    }

    #[test]
    fn test_submit_defaults_constraints() {
        let req: SubmitJob = serde_json::from_value(serde_json::json!({
            "mode": "single",
            "target": { "kind": "slot", "date": "2025-06-01", "meal_type": "dinner" }
        }))
        .unwrap();
        assert_eq!(req.mode, JobMode::Single);
        assert_eq!(req.constraints, Constraints::default());
    }
}
