//! Job progress watching
//!
//! Follows a job's SSE change feed until it completes or fails. When the feed
//! is unavailable or drops, falls back to polling `GET /job/{id}`. Watching
//! never changes the job.

use futures::StreamExt;
use mealplan_core::domain::job::{JobResult, JobStatus};
use mealplan_core::dto::job::{JOB_UPDATE_EVENT, JobUpdate};
use reqwest_eventsource::{Event, EventSource};
use std::time::Duration;
use uuid::Uuid;

use crate::OrchestratorClient;
use crate::error::{ClientError, Result};

/// Terminal result of a watched job
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed(JobResult),
    Failed(String),
}

impl JobOutcome {
    fn from_update(update: &JobUpdate) -> Option<Self> {
        match update.status {
            JobStatus::Completed => Some(JobOutcome::Completed(
                update
                    .result
                    .clone()
                    .unwrap_or(JobResult { meals: Vec::new() }),
            )),
            JobStatus::Failed => Some(JobOutcome::Failed(
                update
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string()),
            )),
            JobStatus::Pending | JobStatus::Processing => None,
        }
    }
}

pub struct JobWatcher {
    client: OrchestratorClient,
    poll_interval: Duration,
}

impl JobWatcher {
    pub fn new(client: OrchestratorClient) -> Self {
        Self {
            client,
            poll_interval: Duration::from_secs(2),
        }
    }

    /// Interval between reads once the watcher has fallen back to polling
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Waits for the job to finish, passing every observed update to `on_update`
    pub async fn watch<F>(&self, job_id: Uuid, mut on_update: F) -> Result<JobOutcome>
    where
        F: FnMut(&JobUpdate),
    {
        match self.follow_events(job_id, &mut on_update).await {
            Ok(Some(outcome)) => return Ok(outcome),
            Ok(None) => {
                tracing::debug!("Change feed for job {} ended early, polling", job_id)
            }
            Err(e) if e.is_not_found() || matches!(e, ClientError::MissingOwner) => return Err(e),
            Err(e) => tracing::warn!("Change feed for job {} failed ({}), polling", job_id, e),
        }

        self.poll(job_id, &mut on_update).await
    }

    async fn follow_events<F>(&self, job_id: Uuid, on_update: &mut F) -> Result<Option<JobOutcome>>
    where
        F: FnMut(&JobUpdate),
    {
        let request = self.client.job_events_request(job_id)?;
        let mut source =
            EventSource::new(request).map_err(|e| ClientError::StreamFailed(e.to_string()))?;

        let outcome = loop {
            let Some(event) = source.next().await else {
                break Ok(None);
            };

            match event {
                Ok(Event::Open) => tracing::debug!("Change feed for job {} open", job_id),
                Ok(Event::Message(message)) if message.event == JOB_UPDATE_EVENT => {
                    let update: JobUpdate = match serde_json::from_str(&message.data) {
                        Ok(update) => update,
                        Err(e) => break Err(ClientError::ParseError(e.to_string())),
                    };
                    on_update(&update);
                    if let Some(outcome) = JobOutcome::from_update(&update) {
                        break Ok(Some(outcome));
                    }
                }
                Ok(Event::Message(_)) => {}
                Err(reqwest_eventsource::Error::StreamEnded) => break Ok(None),
                Err(reqwest_eventsource::Error::InvalidStatusCode(status, _)) => {
                    break Err(ClientError::api_error(
                        status.as_u16(),
                        "change feed rejected",
                    ));
                }
                Err(e) => break Err(ClientError::StreamFailed(e.to_string())),
            }
        };

        source.close();
        outcome
    }

    async fn poll<F>(&self, job_id: Uuid, on_update: &mut F) -> Result<JobOutcome>
    where
        F: FnMut(&JobUpdate),
    {
        let mut last_seen = None;

        loop {
            let job = self.client.get_job(job_id).await?;
            let update = JobUpdate::from(&job);

            if last_seen != Some(update.updated_at) {
                last_seen = Some(update.updated_at);
                on_update(&update);
            }

            if let Some(outcome) = JobOutcome::from_update(&update) {
                return Ok(outcome);
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
