//! Postgres-backed stores

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use mealplan_core::domain::job::{Job, JobProgress, JobResult};
use mealplan_core::domain::plan::{Day, DayPlan, Week};
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    JobStore, MealWrite, PlanStore, StoreResult, job_repository, plan_repository,
};

/// Both stores over one connection pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn insert(&self, job: &Job) -> StoreResult<()> {
        job_repository::create(&self.pool, job).await
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<Job>> {
        job_repository::find_by_id(&self.pool, id).await
    }

    async fn find_active(&self, owner: Uuid) -> StoreResult<Vec<Job>> {
        job_repository::find_active_by_owner(&self.pool, owner).await
    }

    async fn record_progress(
        &self,
        id: Uuid,
        progress: &JobProgress,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Job>> {
        job_repository::update_progress(&self.pool, id, progress, now).await
    }

    async fn fail(
        &self,
        id: Uuid,
        message: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Job>> {
        job_repository::update_status_to_failed(&self.pool, id, message, now).await
    }

    async fn fail_many(
        &self,
        ids: &[Uuid],
        message: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Job>> {
        job_repository::update_many_to_failed(&self.pool, ids, message, now).await
    }

    async fn complete(
        &self,
        id: Uuid,
        result: &JobResult,
        writes: &[MealWrite],
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Job>> {
        job_repository::complete(&self.pool, id, result, writes, now).await
    }
}

#[async_trait]
impl PlanStore for PgStore {
    async fn find_week(&self, owner: Uuid, start_date: NaiveDate) -> StoreResult<Option<Week>> {
        plan_repository::find_week(&self.pool, owner, start_date).await
    }

    async fn create_week(&self, week: &Week) -> StoreResult<Week> {
        plan_repository::create_week(&self.pool, week).await
    }

    async fn find_day(&self, owner: Uuid, date: NaiveDate) -> StoreResult<Option<Day>> {
        plan_repository::find_day(&self.pool, owner, date).await
    }

    async fn create_day(&self, day: &Day) -> StoreResult<Day> {
        plan_repository::create_day(&self.pool, day).await
    }

    async fn day_plan(&self, owner: Uuid, date: NaiveDate) -> StoreResult<Option<DayPlan>> {
        plan_repository::find_day_plan(&self.pool, owner, date).await
    }
}
