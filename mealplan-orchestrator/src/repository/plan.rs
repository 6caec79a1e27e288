//! Plan Repository
//!
//! Handles week and day containers and the meals stored in them.

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use mealplan_core::domain::plan::{Day, DayPlan, StoredMeal, Week};
use mealplan_core::domain::slot::MealType;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::{MealWrite, StoreError, StoreResult};

/// Find the week of an owner starting on `start_date`
pub async fn find_week(
    pool: &PgPool,
    owner: Uuid,
    start_date: NaiveDate,
) -> StoreResult<Option<Week>> {
    let row = sqlx::query_as::<_, WeekRow>(
        r#"
        SELECT id, owner_id, start_date, end_date, created_at
        FROM plan_weeks
        WHERE owner_id = $1 AND start_date = $2
        "#,
    )
    .bind(owner)
    .bind(start_date)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Week::from))
}

/// Insert a week, keeping the existing row when another writer got there first
pub async fn create_week(pool: &PgPool, week: &Week) -> StoreResult<Week> {
    sqlx::query(
        r#"
        INSERT INTO plan_weeks (id, owner_id, start_date, end_date, created_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (owner_id, start_date) DO NOTHING
        "#,
    )
    .bind(week.id)
    .bind(week.owner)
    .bind(week.start_date)
    .bind(week.end_date)
    .bind(week.created_at)
    .execute(pool)
    .await?;

    find_week(pool, week.owner, week.start_date)
        .await?
        .ok_or_else(|| StoreError::Integrity(format!("week {} vanished", week.start_date)))
}

/// Find the day of an owner on `date`
pub async fn find_day(pool: &PgPool, owner: Uuid, date: NaiveDate) -> StoreResult<Option<Day>> {
    let row = sqlx::query_as::<_, DayRow>(
        r#"
        SELECT id, owner_id, week_id, date, day_of_week, created_at
        FROM plan_days
        WHERE owner_id = $1 AND date = $2
        "#,
    )
    .bind(owner)
    .bind(date)
    .fetch_optional(pool)
    .await?;

    row.map(Day::try_from).transpose()
}

/// Insert a day, keeping the existing row when another writer got there first
pub async fn create_day(pool: &PgPool, day: &Day) -> StoreResult<Day> {
    sqlx::query(
        r#"
        INSERT INTO plan_days (id, owner_id, week_id, date, day_of_week, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (owner_id, date) DO NOTHING
        "#,
    )
    .bind(day.id)
    .bind(day.owner)
    .bind(day.week_id)
    .bind(day.date)
    .bind(day.day_of_week.num_days_from_monday() as i16)
    .bind(day.created_at)
    .execute(pool)
    .await?;

    find_day(pool, day.owner, day.date)
        .await?
        .ok_or_else(|| StoreError::Integrity(format!("day {} vanished", day.date)))
}

/// Load a day together with its meals
pub async fn find_day_plan(
    pool: &PgPool,
    owner: Uuid,
    date: NaiveDate,
) -> StoreResult<Option<DayPlan>> {
    let Some(day) = find_day(pool, owner, date).await? else {
        return Ok(None);
    };

    let rows = sqlx::query_as::<_, MealRow>(
        r#"
        SELECT id, day_id, meal_type, content, job_id, updated_at
        FROM plan_meals
        WHERE day_id = $1
        "#,
    )
    .bind(day.id)
    .fetch_all(pool)
    .await?;

    let mut meals = rows
        .into_iter()
        .map(StoredMeal::try_from)
        .collect::<StoreResult<Vec<_>>>()?;
    meals.sort_by_key(|m| m.meal_type);

    Ok(Some(DayPlan { day, meals }))
}

/// Insert or overwrite the meal in one `(day, meal_type)` slot
///
/// Runs on the caller's connection so it can join a job completion transaction.
pub async fn upsert_meal(
    conn: &mut PgConnection,
    write: &MealWrite,
    job_id: Uuid,
    now: DateTime<Utc>,
) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO plan_meals (id, day_id, meal_type, content, job_id, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (day_id, meal_type)
        DO UPDATE SET content = EXCLUDED.content, job_id = EXCLUDED.job_id,
                      updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(write.day_id)
    .bind(write.meal_type.as_str())
    .bind(Json(&write.meal))
    .bind(job_id)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(())
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct WeekRow {
    id: Uuid,
    owner_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
    created_at: DateTime<Utc>,
}

impl From<WeekRow> for Week {
    fn from(row: WeekRow) -> Self {
        Week {
            id: row.id,
            owner: row.owner_id,
            start_date: row.start_date,
            end_date: row.end_date,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DayRow {
    id: Uuid,
    owner_id: Uuid,
    week_id: Uuid,
    date: NaiveDate,
    day_of_week: i16,
    created_at: DateTime<Utc>,
}

impl TryFrom<DayRow> for Day {
    type Error = StoreError;

    fn try_from(row: DayRow) -> Result<Self, Self::Error> {
        let day_of_week = u8::try_from(row.day_of_week)
            .ok()
            .and_then(|n| Weekday::try_from(n).ok())
            .ok_or_else(|| StoreError::Corrupt(format!("day_of_week {}", row.day_of_week)))?;

        Ok(Day {
            id: row.id,
            owner: row.owner_id,
            week_id: row.week_id,
            date: row.date,
            day_of_week,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MealRow {
    id: Uuid,
    day_id: Uuid,
    meal_type: String,
    content: serde_json::Value,
    job_id: Uuid,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MealRow> for StoredMeal {
    type Error = StoreError;

    fn try_from(row: MealRow) -> Result<Self, Self::Error> {
        Ok(StoredMeal {
            id: row.id,
            day_id: row.day_id,
            meal_type: row
                .meal_type
                .parse::<MealType>()
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            meal: serde_json::from_value(row.content)?,
            job_id: row.job_id,
            updated_at: row.updated_at,
        })
    }
}
