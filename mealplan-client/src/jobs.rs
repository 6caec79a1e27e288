//! Job-related API endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use mealplan_core::domain::job::{Job, JobProgress};
use mealplan_core::dto::job::{
    CompleteJob, FailJob, PendingJobs, PendingQuery, SubmitJob, SubmitJobResponse,
};
use reqwest::Method;
use uuid::Uuid;

impl OrchestratorClient {
    // =============================================================================
    // Job Submission and Reads
    // =============================================================================

    /// Submit a generation job
    ///
    /// Returns as soon as the orchestrator has recorded the job; generation
    /// continues in the background. An overlapping active job yields a
    /// conflict error (`is_conflict`).
    pub async fn submit_job(&self, req: SubmitJob) -> Result<SubmitJobResponse> {
        let response = self
            .scoped(Method::POST, "/job/submit")?
            .json(&req)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// List active jobs; stale ones are reclaimed by this read
    pub async fn list_pending(&self, query: &PendingQuery) -> Result<PendingJobs> {
        let response = self
            .scoped(Method::GET, "/job/pending")?
            .query(query)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get a job by ID
    ///
    /// A job that went stale is failed by this read, so an active status is
    /// never older than the orchestrator's stale timeout.
    ///
    /// # Arguments
    /// * `job_id` - The job ID
    ///
    /// # Returns
    /// The job as currently stored
    pub async fn get_job(&self, job_id: Uuid) -> Result<Job> {
        let response = self
            .scoped(Method::GET, &format!("/job/{}", job_id))?
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Request for the job's SSE feed
    pub(crate) fn job_events_request(&self, job_id: Uuid) -> Result<reqwest::RequestBuilder> {
        self.scoped(Method::GET, &format!("/job/{}/events", job_id))
    }

    // =============================================================================
    // Worker Callbacks
    // =============================================================================

    /// Report generation progress, moving the job to processing
    pub async fn report_progress(&self, job_id: Uuid, progress: &JobProgress) -> Result<()> {
        let response = self
            .scoped(Method::POST, &format!("/job/{}/progress", job_id))?
            .json(progress)
            .send()
            .await?;

        self.handle_empty_response(response).await
    }

    /// Store generated meals and complete the job in one step
    ///
    /// # Arguments
    /// * `job_id` - The job ID
    /// * `req` - One generated meal per target slot
    ///
    /// # Returns
    /// Unit on success; a conflict error if the job already finished
    pub async fn complete_job(&self, job_id: Uuid, req: &CompleteJob) -> Result<()> {
        let response = self
            .scoped(Method::POST, &format!("/job/{}/complete", job_id))?
            .json(req)
            .send()
            .await?;

        self.handle_empty_response(response).await
    }

    /// Mark the job failed with a tagged message
    pub async fn fail_job(&self, job_id: Uuid, error_message: impl Into<String>) -> Result<()> {
        let response = self
            .scoped(Method::POST, &format!("/job/{}/fail", job_id))?
            .json(&FailJob {
                error_message: error_message.into(),
            })
            .send()
            .await?;

        self.handle_empty_response(response).await
    }
}
