//! Repository Module
//!
//! Data access layer for the orchestrator.
//! `JobStore` and `PlanStore` are the seams the services talk to; `PgStore`
//! backs them with Postgres and `InMemoryStore` keeps everything in process.

pub mod job;
pub mod memory;
pub mod plan;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use mealplan_core::domain::job::{Job, JobProgress, JobResult};
use mealplan_core::domain::plan::{Day, DayPlan, Meal, Week};
use mealplan_core::domain::slot::MealType;
use uuid::Uuid;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

// Re-export for convenience
pub use job as job_repository;
pub use plan as plan_repository;

/// Storage error type
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// A stored row could not be decoded into a domain value
    #[error("corrupt row: {0}")]
    Corrupt(String),
    /// A write referenced a row that does not exist
    #[error("integrity violation: {0}")]
    Integrity(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One meal row written by a job completion
#[derive(Debug, Clone, PartialEq)]
pub struct MealWrite {
    pub day_id: Uuid,
    pub meal_type: MealType,
    pub meal: Meal,
}

/// Persistence for generation jobs
///
/// Every mutating method only touches rows that are still active and returns
/// `None` (or skips the row) otherwise, so terminal jobs are never overwritten.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert(&self, job: &Job) -> StoreResult<()>;

    async fn find(&self, id: Uuid) -> StoreResult<Option<Job>>;

    /// Pending and processing jobs of one owner, oldest first
    async fn find_active(&self, owner: Uuid) -> StoreResult<Vec<Job>>;

    /// Stores progress and moves the job to processing
    async fn record_progress(
        &self,
        id: Uuid,
        progress: &JobProgress,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Job>>;

    async fn fail(&self, id: Uuid, message: &str, now: DateTime<Utc>)
    -> StoreResult<Option<Job>>;

    /// Fails every still-active job in `ids` in one write, returning the rows changed
    async fn fail_many(
        &self,
        ids: &[Uuid],
        message: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Job>>;

    /// Writes the meals and the completed status together or not at all
    async fn complete(
        &self,
        id: Uuid,
        result: &JobResult,
        writes: &[MealWrite],
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Job>>;
}

/// Persistence for week and day containers and their meals
#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn find_week(&self, owner: Uuid, start_date: NaiveDate) -> StoreResult<Option<Week>>;

    /// Inserts the week unless one already exists; returns the stored row either way
    async fn create_week(&self, week: &Week) -> StoreResult<Week>;

    async fn find_day(&self, owner: Uuid, date: NaiveDate) -> StoreResult<Option<Day>>;

    /// Inserts the day unless one already exists; returns the stored row either way
    async fn create_day(&self, day: &Day) -> StoreResult<Day>;

    async fn day_plan(&self, owner: Uuid, date: NaiveDate) -> StoreResult<Option<DayPlan>>;
}
