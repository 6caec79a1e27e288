//! Worker DTOs
//!
//! Body of the dispatch call from the orchestrator to the generation worker.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::job::{Constraints, Job, JobMode, JobStatus, JobTarget};

/// Default limit a worker puts on generating one job
pub const DEFAULT_WORKER_JOB_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Time a worker may still need after its own limit to send the final
/// complete or fail callback
pub const WORKER_CALLBACK_ALLOWANCE: Duration = Duration::from_secs(60);

/// Everything a worker needs to run one job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerInvocation {
    pub job_id: Uuid,
    pub owner: Uuid,
    pub mode: JobMode,
    pub target: JobTarget,
    #[serde(default)]
    pub constraints: Constraints,
}

impl From<&Job> for WorkerInvocation {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id,
            owner: job.owner,
            mode: job.mode,
            target: job.target.clone(),
            constraints: job.constraints.clone(),
        }
    }
}

/// Worker answer once the job reached a terminal state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}
