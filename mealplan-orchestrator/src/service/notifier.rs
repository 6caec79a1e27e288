//! Progress Notifier
//!
//! In-process change feed of job rows. Every service write publishes the
//! updated row; SSE subscribers filter the feed down to one job.

use async_stream::stream;
use chrono::{Duration, Utc};
use futures::Stream;
use mealplan_core::domain::job::Job;
use mealplan_core::dto::job::JobUpdate;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

#[derive(Clone)]
pub struct JobEvents {
    sender: broadcast::Sender<JobUpdate>,
}

impl JobEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes the current state of `job`
    pub fn publish(&self, job: &Job) {
        // No receivers is the normal case between watches
        let _ = self.sender.send(JobUpdate::from(job));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobUpdate> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Update stream for one job: the current row, then live changes
///
/// The receiver must be created before `current` is read so no write between
/// the read and the subscription is lost. Ends after the first terminal
/// update, when the subscriber falls behind so the client can re-read, or
/// once the job has been quiet for `stale_after`.
pub fn job_stream(
    current: Job,
    mut receiver: broadcast::Receiver<JobUpdate>,
    stale_after: Duration,
) -> impl Stream<Item = JobUpdate> {
    stream! {
        let first = JobUpdate::from(&current);
        let mut done = first.is_terminal();
        let mut last_touched = current.last_touched();
        yield first;

        while !done {
            let quiet_for = match last_touched.checked_add_signed(stale_after) {
                Some(deadline) => (deadline - Utc::now()).to_std().unwrap_or_default(),
                None => std::time::Duration::MAX,
            };

            match tokio::time::timeout(quiet_for, receiver.recv()).await {
                Ok(Ok(update)) if update.job_id == current.id => {
                    done = update.is_terminal();
                    last_touched = last_touched.max(update.updated_at);
                    yield update;
                }
                Ok(Ok(_)) => continue,
                Ok(Err(RecvError::Lagged(skipped))) => {
                    tracing::warn!("Event subscriber for job {} lagged by {}", current.id, skipped);
                    break;
                }
                Ok(Err(RecvError::Closed)) => break,
                Err(_) => {
                    tracing::debug!("Job {} went quiet past its stale timeout", current.id);
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use futures::StreamExt;
    use mealplan_core::domain::job::{
        Constraints, JobMode, JobProgress, JobStatus, JobTarget,
    };
    use mealplan_core::domain::slot::{MealType, SlotRef};
    use uuid::Uuid;

    fn job() -> Job {
        Job::new(
            Uuid::new_v4(),
            JobMode::Single,
            JobTarget::Slot(SlotRef::new(
                NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
                MealType::Dinner,
            )),
            Constraints::default(),
            vec![],
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_stream_ends_after_terminal_update() {
        let events = JobEvents::new(16);
        let mut job = job();
        let other = self::job();
        let receiver = events.subscribe();

        let stream = job_stream(job.clone(), receiver, Duration::minutes(20));

        job.status = JobStatus::Processing;
        job.progress = Some(JobProgress::new(0, 1));
        events.publish(&job);
        events.publish(&other);
        job.status = JobStatus::Completed;
        events.publish(&job);

        let updates: Vec<JobUpdate> = stream.collect().await;
        let statuses: Vec<JobStatus> = updates.iter().map(|u| u.status).collect();
        assert_eq!(
            statuses,
            vec![JobStatus::Pending, JobStatus::Processing, JobStatus::Completed]
        );
        assert!(updates.iter().all(|u| u.job_id == job.id));
    }

    #[tokio::test]
    async fn test_terminal_snapshot_yields_once() {
        let events = JobEvents::new(16);
        let mut job = job();
        job.status = JobStatus::Failed;

        let updates: Vec<JobUpdate> = job_stream(job, events.subscribe(), Duration::minutes(20))
            .collect()
            .await;
        assert_eq!(updates.len(), 1);
    }

    #[tokio::test]
    async fn test_stream_ends_when_job_goes_quiet() {
        let events = JobEvents::new(16);
        let job = job();
        let other = self::job();
        let stream = job_stream(job.clone(), events.subscribe(), Duration::milliseconds(100));

        // Traffic for other jobs does not keep this one alive
        let publisher = events.clone();
        tokio::spawn(async move {
            for _ in 0..10 {
                publisher.publish(&other);
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            }
        });

        let updates: Vec<JobUpdate> =
            tokio::time::timeout(std::time::Duration::from_secs(2), stream.collect())
                .await
                .unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_silent() {
        let events = JobEvents::new(4);
        events.publish(&job());
        assert_eq!(events.subscriber_count(), 0);
    }
}
