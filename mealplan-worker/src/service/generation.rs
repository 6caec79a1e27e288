//! Generation service
//!
//! Runs one job from dispatch to terminal write:
//! - Reports `0/total` progress, which moves the job to processing
//! - For regenerate jobs, reads the meals being replaced
//! - Generates each day batch, retrying unusable model output
//! - Completes the job with every meal at once, or fails it with a tag
//!
//! A job the orchestrator already finished (reclaimed as stale) answers
//! callbacks with a conflict; the run then stops without writing anything.

use mealplan_client::ClientError;
use mealplan_core::domain::job::{FailureReason, GeneratedMeal, JobMode, JobProgress, JobStatus};
use mealplan_core::dto::job::CompleteJob;
use mealplan_core::dto::worker::{WorkerInvocation, WorkerResponse};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::extract::{ExtractError, extract_payload};
use crate::instruction::Instruction;
use crate::model::{GenerativeModel, ModelError};
use crate::repository::{JobRepository, PlanRepository};
use crate::service::batch::{BatchPayload, DayBatch, SlotMismatch, split_batches};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{0}")]
    Model(#[from] ModelError),

    #[error("{0}")]
    InvalidOutput(String),

    #[error("{0}")]
    WriteFailed(String),

    #[error("job exceeded {}s", .0.as_secs())]
    Timeout(Duration),

    /// The orchestrator already moved the job to a terminal state
    #[error("job is no longer active")]
    Superseded,
}

impl GenerationError {
    pub fn reason(&self) -> FailureReason {
        match self {
            GenerationError::Model(_) => FailureReason::ModelUnavailable,
            GenerationError::InvalidOutput(_) => FailureReason::InvalidModelOutput,
            GenerationError::WriteFailed(_) | GenerationError::Superseded => {
                FailureReason::WriteFailed
            }
            GenerationError::Timeout(_) => FailureReason::WorkerTimeout,
        }
    }

    /// Tagged message stored on the failed job
    pub fn message(&self) -> String {
        self.reason().with_detail(self)
    }
}

impl From<ExtractError> for GenerationError {
    fn from(err: ExtractError) -> Self {
        GenerationError::InvalidOutput(err.to_string())
    }
}

impl From<SlotMismatch> for GenerationError {
    fn from(err: SlotMismatch) -> Self {
        GenerationError::InvalidOutput(err.to_string())
    }
}

pub struct GenerationService {
    model: Arc<dyn GenerativeModel>,
    jobs: Arc<dyn JobRepository>,
    plans: Arc<dyn PlanRepository>,
    max_parse_retries: u32,
    job_timeout: Duration,
}

impl GenerationService {
    pub fn new(
        model: Arc<dyn GenerativeModel>,
        jobs: Arc<dyn JobRepository>,
        plans: Arc<dyn PlanRepository>,
        max_parse_retries: u32,
        job_timeout: Duration,
    ) -> Self {
        Self {
            model,
            jobs,
            plans,
            max_parse_retries,
            job_timeout,
        }
    }

    /// Runs the job to a terminal state and reports how it ended
    pub async fn run(&self, invocation: WorkerInvocation) -> WorkerResponse {
        let job_id = invocation.job_id;
        let owner = invocation.owner;
        info!("Generating job {} ({})", job_id, invocation.mode);

        let outcome = match tokio::time::timeout(self.job_timeout, self.generate(&invocation)).await
        {
            Ok(Ok(meals)) => self.complete(owner, job_id, meals).await,
            Ok(Err(e)) => Err(e),
            Err(_) => Err(GenerationError::Timeout(self.job_timeout)),
        };

        let err = match outcome {
            Ok(()) => {
                info!("Job {} completed", job_id);
                return WorkerResponse {
                    job_id,
                    status: JobStatus::Completed,
                    error_message: None,
                };
            }
            Err(err) => err,
        };

        let message = err.message();

        if matches!(err, GenerationError::Superseded) {
            warn!("Job {} was finished elsewhere, dropping its output", job_id);
        } else {
            error!("Job {} failed: {}", job_id, message);
            match self.jobs.fail(owner, job_id, message.clone()).await {
                Ok(()) => {}
                Err(e) if e.is_conflict() => {
                    debug!("Job {} already terminal, failure not recorded", job_id)
                }
                Err(e) => error!("Failed to record failure of job {}: {}", job_id, e),
            }
        }

        WorkerResponse {
            job_id,
            status: JobStatus::Failed,
            error_message: Some(message),
        }
    }

    async fn generate(
        &self,
        invocation: &WorkerInvocation,
    ) -> Result<Vec<GeneratedMeal>, GenerationError> {
        let batches = split_batches(&invocation.target);
        let total: usize = batches.iter().map(|b| b.meal_types.len()).sum();

        self.progress(invocation, JobProgress::new(0, total as u32))
            .await?;

        let mut meals = Vec::with_capacity(total);

        for batch in &batches {
            let avoid = match invocation.mode {
                JobMode::Regenerate => self.replaced_meals(invocation.owner, batch).await,
                _ => Vec::new(),
            };

            let instruction = Instruction::for_batch(batch, &invocation.constraints, &avoid);
            let generated = self.generate_batch(&instruction, batch).await?;
            meals.extend(generated);

            let progress = JobProgress::new(meals.len() as u32, total as u32)
                .with_message(format!("generated {}", batch.date));
            self.progress(invocation, progress).await?;
        }

        Ok(meals)
    }

    async fn generate_batch(
        &self,
        instruction: &Instruction,
        batch: &DayBatch,
    ) -> Result<Vec<GeneratedMeal>, GenerationError> {
        let mut attempt = 0;

        loop {
            let raw = self.model.generate(instruction).await?;

            let parsed = extract_payload::<BatchPayload>(&raw)
                .map_err(GenerationError::from)
                .and_then(|payload| payload.into_meals(batch).map_err(GenerationError::from));

            match parsed {
                Ok(meals) => return Ok(meals),
                Err(e) if attempt < self.max_parse_retries => {
                    attempt += 1;
                    warn!(
                        "Unusable model output for {} (attempt {}): {}",
                        batch.date, attempt, e
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Names of the meals currently in the batch's slots
    async fn replaced_meals(&self, owner: Uuid, batch: &DayBatch) -> Vec<String> {
        match self.plans.fetch_day(owner, batch.date).await {
            Ok(Some(plan)) => batch
                .meal_types
                .iter()
                .filter_map(|meal_type| plan.meal(*meal_type))
                .map(|stored| stored.meal.name.clone())
                .collect(),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Could not read current meals for {}: {}", batch.date, e);
                Vec::new()
            }
        }
    }

    async fn progress(
        &self,
        invocation: &WorkerInvocation,
        progress: JobProgress,
    ) -> Result<(), GenerationError> {
        debug!(
            "Job {} progress {}/{}",
            invocation.job_id, progress.done, progress.total
        );

        match self
            .jobs
            .report_progress(invocation.owner, invocation.job_id, progress)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_conflict() => Err(GenerationError::Superseded),
            Err(e) => {
                warn!(
                    "Progress report for job {} failed: {}",
                    invocation.job_id, e
                );
                Ok(())
            }
        }
    }

    async fn complete(
        &self,
        owner: Uuid,
        job_id: Uuid,
        meals: Vec<GeneratedMeal>,
    ) -> Result<(), GenerationError> {
        match self.jobs.complete(owner, job_id, CompleteJob { meals }).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_conflict() => Err(GenerationError::Superseded),
            Err(e) => Err(write_failed(e)),
        }
    }
}

fn write_failed(err: ClientError) -> GenerationError {
    match err {
        ClientError::ApiError { status, message } => {
            GenerationError::WriteFailed(format!("{} {}", status, message))
        }
        other => GenerationError::WriteFailed(other.to_string()),
    }
}
