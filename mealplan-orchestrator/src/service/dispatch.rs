//! Worker Dispatch
//!
//! Fire-and-forget invocation of the generation worker. Each dispatch runs on
//! its own tracked task; the submitting request never waits for it.

use mealplan_core::domain::job::{FailureReason, Job};
use mealplan_core::dto::worker::WorkerInvocation;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::task::TaskTracker;

use crate::repository::JobStore;
use crate::service::job::mark_failed;
use crate::service::notifier::JobEvents;

/// Longest worker response body copied into a failure message
const MAX_ERROR_BODY: usize = 200;

#[derive(Clone)]
pub struct Dispatcher {
    client: reqwest::Client,
    worker_url: String,
    tracker: TaskTracker,
    jobs: Arc<dyn JobStore>,
    events: JobEvents,
}

impl Dispatcher {
    /// Creates a dispatcher whose calls give up after `timeout`
    pub fn new(
        worker_url: &str,
        timeout: Duration,
        jobs: Arc<dyn JobStore>,
        events: JobEvents,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            worker_url: worker_url.trim_end_matches('/').to_string(),
            tracker: TaskTracker::new(),
            jobs,
            events,
        })
    }

    /// Starts the worker call for `job` in the background
    pub fn dispatch(&self, job: &Job) {
        let url = format!("{}/generate/{}", self.worker_url, job.mode.worker_route());
        let invocation = WorkerInvocation::from(job);
        let this = self.clone();

        tracing::debug!("Dispatching job {} to {}", job.id, url);
        self.tracker.spawn(async move { this.invoke(url, invocation).await });
    }

    async fn invoke(&self, url: String, invocation: WorkerInvocation) {
        let job_id = invocation.job_id;

        let message = match self.client.post(&url).json(&invocation).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!("Worker finished job {}", job_id);
                return;
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let body: String = body.trim().chars().take(MAX_ERROR_BODY).collect();
                FailureReason::WorkerHttpError.with_detail(format!("{} {}", status.as_u16(), body))
            }
            Err(e) if e.is_timeout() => FailureReason::DispatchTimeout.tag().to_string(),
            Err(e) => FailureReason::DispatchFailed.with_detail(e),
        };

        match mark_failed(self.jobs.as_ref(), &self.events, job_id, &message).await {
            Ok(Some(_)) => tracing::warn!("Dispatch of job {} failed: {}", job_id, message),
            Ok(None) => {
                tracing::debug!("Dispatch error for job {} ignored, already terminal", job_id)
            }
            Err(e) => tracing::error!("Failed to record dispatch failure for job {}: {}", job_id, e),
        }
    }

    /// Number of dispatch tasks still running
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Closes the tracker and waits up to `grace` for running dispatches
    ///
    /// Returns `false` when the grace period ran out first.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.tracker.close();
        tokio::time::timeout(grace, self.tracker.wait()).await.is_ok()
    }
}
