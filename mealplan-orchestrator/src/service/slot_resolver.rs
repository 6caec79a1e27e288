//! Slot Resolver
//!
//! Finds or creates the week and day containers a target's content will be
//! written into.

use chrono::{DateTime, NaiveDate, Utc};
use mealplan_core::domain::job::{DayRef, JobTarget};
use mealplan_core::domain::plan::{Day, Week};
use mealplan_core::domain::slot::week_start;
use uuid::Uuid;

use crate::repository::{PlanStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("day {date} belongs to week {found}, expected the week starting {expected}")]
    WeekMismatch {
        date: NaiveDate,
        found: Uuid,
        expected: NaiveDate,
    },
    #[error("no plan week can hold {0}")]
    DateOutOfRange(NaiveDate),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Resolves one container pair per distinct date of `target`
///
/// Creation is idempotent in the store, so concurrent calls for the same
/// owner and date converge on the same rows.
pub async fn resolve(
    plans: &dyn PlanStore,
    owner: Uuid,
    target: &JobTarget,
    now: DateTime<Utc>,
) -> Result<Vec<DayRef>, ResolveError> {
    let mut refs = Vec::new();
    let mut week: Option<Week> = None;

    for date in target.dates() {
        let start = week_start(date).ok_or(ResolveError::DateOutOfRange(date))?;
        let current = match week.take() {
            Some(w) if w.start_date == start => w,
            _ => find_or_create_week(plans, owner, date, now).await?,
        };

        let day = match plans.find_day(owner, date).await? {
            Some(day) => day,
            None => {
                tracing::debug!("Creating day container {} for owner {}", date, owner);
                plans.create_day(&Day::new(owner, current.id, date, now)).await?
            }
        };

        if day.week_id != current.id {
            return Err(ResolveError::WeekMismatch {
                date,
                found: day.week_id,
                expected: current.start_date,
            });
        }

        refs.push(DayRef {
            date,
            day_id: day.id,
            week_id: current.id,
        });
        week = Some(current);
    }

    Ok(refs)
}

async fn find_or_create_week(
    plans: &dyn PlanStore,
    owner: Uuid,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<Week, ResolveError> {
    let week = Week::containing(owner, date, now).ok_or(ResolveError::DateOutOfRange(date))?;

    if let Some(existing) = plans.find_week(owner, week.start_date).await? {
        return Ok(existing);
    }

    tracing::debug!("Creating week container for {} (owner {})", date, owner);
    Ok(plans.create_week(&week).await?)
}
