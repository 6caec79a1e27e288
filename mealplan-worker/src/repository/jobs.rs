//! Jobs repository
//!
//! Lifecycle callbacks for the job being generated:
//! - Reporting progress (moves the job to processing)
//! - Completing with all generated meals
//! - Failing with a tagged message

use async_trait::async_trait;
use mealplan_client::{OrchestratorClient, Result};
use mealplan_core::domain::job::JobProgress;
use mealplan_core::dto::job::CompleteJob;
use uuid::Uuid;

/// Repository trait for job callbacks to the orchestrator
///
/// A rejected call on a terminal job comes back as a conflict
/// (`ClientError::is_conflict`).
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn report_progress(&self, owner: Uuid, job_id: Uuid, progress: JobProgress)
    -> Result<()>;

    async fn complete(&self, owner: Uuid, job_id: Uuid, req: CompleteJob) -> Result<()>;

    async fn fail(&self, owner: Uuid, job_id: Uuid, error_message: String) -> Result<()>;
}

/// HTTP implementation of JobRepository
pub struct HttpJobRepository {
    client: OrchestratorClient,
}

impl HttpJobRepository {
    pub fn new(client: OrchestratorClient) -> Self {
        Self { client }
    }

    fn for_owner(&self, owner: Uuid) -> OrchestratorClient {
        self.client.clone().with_owner(owner)
    }
}

#[async_trait]
impl JobRepository for HttpJobRepository {
    async fn report_progress(
        &self,
        owner: Uuid,
        job_id: Uuid,
        progress: JobProgress,
    ) -> Result<()> {
        self.for_owner(owner)
            .report_progress(job_id, &progress)
            .await
    }

    async fn complete(&self, owner: Uuid, job_id: Uuid, req: CompleteJob) -> Result<()> {
        self.for_owner(owner).complete_job(job_id, &req).await
    }

    async fn fail(&self, owner: Uuid, job_id: Uuid, error_message: String) -> Result<()> {
        self.for_owner(owner).fail_job(job_id, error_message).await
    }
}
