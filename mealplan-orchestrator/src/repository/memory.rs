//! In-memory stores
//!
//! Process-local implementation of both store traits. A single lock guards all
//! tables, so completion is trivially atomic.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use mealplan_core::domain::job::{Job, JobProgress, JobResult, JobStatus};
use mealplan_core::domain::plan::{Day, DayPlan, StoredMeal, Week};
use mealplan_core::domain::slot::MealType;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{JobStore, MealWrite, PlanStore, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    jobs: HashMap<Uuid, Job>,
    weeks: HashMap<(Uuid, NaiveDate), Week>,
    days: HashMap<(Uuid, NaiveDate), Day>,
    meals: HashMap<(Uuid, MealType), StoredMeal>,
    meal_writes: usize,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of meal rows written since creation
    pub fn meal_write_count(&self) -> usize {
        self.lock().meal_writes
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // A panic while holding the lock leaves the maps consistent
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Applies `update` to the job if it is still active
fn update_active(
    tables: &mut Tables,
    id: Uuid,
    update: impl FnOnce(&mut Job),
) -> Option<Job> {
    let job = tables.jobs.get_mut(&id)?;
    if !job.status.is_active() {
        return None;
    }
    update(job);
    Some(job.clone())
}

#[async_trait]
impl JobStore for InMemoryStore {
    async fn insert(&self, job: &Job) -> StoreResult<()> {
        let mut tables = self.lock();
        if tables.jobs.contains_key(&job.id) {
            return Err(StoreError::Integrity(format!("job {} already exists", job.id)));
        }
        tables.jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<Job>> {
        Ok(self.lock().jobs.get(&id).cloned())
    }

    async fn find_active(&self, owner: Uuid) -> StoreResult<Vec<Job>> {
        let mut active: Vec<Job> = self
            .lock()
            .jobs
            .values()
            .filter(|job| job.owner == owner && job.status.is_active())
            .cloned()
            .collect();
        active.sort_by_key(|job| job.created_at);
        Ok(active)
    }

    async fn record_progress(
        &self,
        id: Uuid,
        progress: &JobProgress,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Job>> {
        let mut tables = self.lock();
        Ok(update_active(&mut tables, id, |job| {
            job.status = JobStatus::Processing;
            job.progress = Some(progress.clone());
            job.updated_at = now;
        }))
    }

    async fn fail(
        &self,
        id: Uuid,
        message: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Job>> {
        let mut tables = self.lock();
        Ok(update_active(&mut tables, id, |job| {
            job.status = JobStatus::Failed;
            job.error_message = Some(message.to_string());
            job.updated_at = now;
        }))
    }

    async fn fail_many(
        &self,
        ids: &[Uuid],
        message: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Job>> {
        let mut tables = self.lock();
        Ok(ids
            .iter()
            .filter_map(|id| {
                update_active(&mut tables, *id, |job| {
                    job.status = JobStatus::Failed;
                    job.error_message = Some(message.to_string());
                    job.updated_at = now;
                })
            })
            .collect())
    }

    async fn complete(
        &self,
        id: Uuid,
        result: &JobResult,
        writes: &[MealWrite],
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Job>> {
        let mut tables = self.lock();

        if !tables.jobs.get(&id).is_some_and(|job| job.status.is_active()) {
            return Ok(None);
        }

        // Check every write before applying any of them
        for write in writes {
            if !tables.days.values().any(|day| day.id == write.day_id) {
                return Err(StoreError::Integrity(format!(
                    "day {} does not exist",
                    write.day_id
                )));
            }
        }

        for write in writes {
            let key = (write.day_id, write.meal_type);
            let meal_id = tables.meals.get(&key).map_or_else(Uuid::new_v4, |m| m.id);
            tables.meals.insert(
                key,
                StoredMeal {
                    id: meal_id,
                    day_id: write.day_id,
                    meal_type: write.meal_type,
                    meal: write.meal.clone(),
                    job_id: id,
                    updated_at: now,
                },
            );
            tables.meal_writes += 1;
        }

        Ok(update_active(&mut tables, id, |job| {
            job.status = JobStatus::Completed;
            job.result = Some(result.clone());
            job.updated_at = now;
        }))
    }
}

#[async_trait]
impl PlanStore for InMemoryStore {
    async fn find_week(&self, owner: Uuid, start_date: NaiveDate) -> StoreResult<Option<Week>> {
        Ok(self.lock().weeks.get(&(owner, start_date)).cloned())
    }

    async fn create_week(&self, week: &Week) -> StoreResult<Week> {
        let mut tables = self.lock();
        Ok(tables
            .weeks
            .entry((week.owner, week.start_date))
            .or_insert_with(|| week.clone())
            .clone())
    }

    async fn find_day(&self, owner: Uuid, date: NaiveDate) -> StoreResult<Option<Day>> {
        Ok(self.lock().days.get(&(owner, date)).cloned())
    }

    async fn create_day(&self, day: &Day) -> StoreResult<Day> {
        let mut tables = self.lock();
        if !tables.weeks.values().any(|week| week.id == day.week_id) {
            return Err(StoreError::Integrity(format!(
                "week {} does not exist",
                day.week_id
            )));
        }
        Ok(tables
            .days
            .entry((day.owner, day.date))
            .or_insert_with(|| day.clone())
            .clone())
    }

    async fn day_plan(&self, owner: Uuid, date: NaiveDate) -> StoreResult<Option<DayPlan>> {
        let tables = self.lock();
        let Some(day) = tables.days.get(&(owner, date)).cloned() else {
            return Ok(None);
        };

        let mut meals: Vec<StoredMeal> = tables
            .meals
            .values()
            .filter(|meal| meal.day_id == day.id)
            .cloned()
            .collect();
        meals.sort_by_key(|m| m.meal_type);

        Ok(Some(DayPlan { day, meals }))
    }
}
