//! Job Repository
//!
//! Handles all database operations related to generation jobs.
//! Every update is guarded by `status IN ('pending', 'processing')`.

use chrono::{DateTime, Utc};
use mealplan_core::domain::job::{Job, JobProgress, JobResult, JobStatus};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use super::{MealWrite, StoreError, StoreResult, plan_repository};

const JOB_COLUMNS: &str = "id, owner_id, mode, target, constraints, status, progress, result, \
                           error_message, containers, created_at, updated_at";

/// Insert a new job row
pub async fn create(pool: &PgPool, job: &Job) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO generation_jobs
            (id, owner_id, mode, target, constraints, status, progress, result,
             error_message, containers, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(job.id)
    .bind(job.owner)
    .bind(job.mode.as_str())
    .bind(Json(&job.target))
    .bind(Json(&job.constraints))
    .bind(job.status.as_str())
    .bind(job.progress.as_ref().map(Json))
    .bind(job.result.as_ref().map(Json))
    .bind(&job.error_message)
    .bind(Json(&job.containers))
    .bind(job.created_at)
    .bind(job.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Find a job by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> StoreResult<Option<Job>> {
    let row = sqlx::query_as::<_, JobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM generation_jobs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(Job::try_from).transpose()
}

/// Find the active jobs of an owner
pub async fn find_active_by_owner(pool: &PgPool, owner: Uuid) -> StoreResult<Vec<Job>> {
    let rows = sqlx::query_as::<_, JobRow>(&format!(
        r#"
        SELECT {JOB_COLUMNS}
        FROM generation_jobs
        WHERE owner_id = $1 AND status IN ('pending', 'processing')
        ORDER BY created_at ASC
        "#
    ))
    .bind(owner)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Job::try_from).collect()
}

/// Store progress and move an active job to processing
pub async fn update_progress(
    pool: &PgPool,
    id: Uuid,
    progress: &JobProgress,
    now: DateTime<Utc>,
) -> StoreResult<Option<Job>> {
    let row = sqlx::query_as::<_, JobRow>(&format!(
        r#"
        UPDATE generation_jobs
        SET status = 'processing', progress = $2, updated_at = $3
        WHERE id = $1 AND status IN ('pending', 'processing')
        RETURNING {JOB_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(Json(progress))
    .bind(now)
    .fetch_optional(pool)
    .await?;

    row.map(Job::try_from).transpose()
}

/// Move an active job to failed
pub async fn update_status_to_failed(
    pool: &PgPool,
    id: Uuid,
    message: &str,
    now: DateTime<Utc>,
) -> StoreResult<Option<Job>> {
    let row = sqlx::query_as::<_, JobRow>(&format!(
        r#"
        UPDATE generation_jobs
        SET status = 'failed', error_message = $2, updated_at = $3
        WHERE id = $1 AND status IN ('pending', 'processing')
        RETURNING {JOB_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(message)
    .bind(now)
    .fetch_optional(pool)
    .await?;

    row.map(Job::try_from).transpose()
}

/// Move every still-active job in `ids` to failed in one statement
pub async fn update_many_to_failed(
    pool: &PgPool,
    ids: &[Uuid],
    message: &str,
    now: DateTime<Utc>,
) -> StoreResult<Vec<Job>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, JobRow>(&format!(
        r#"
        UPDATE generation_jobs
        SET status = 'failed', error_message = $2, updated_at = $3
        WHERE id = ANY($1) AND status IN ('pending', 'processing')
        RETURNING {JOB_COLUMNS}
        "#
    ))
    .bind(ids)
    .bind(message)
    .bind(now)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Job::try_from).collect()
}

/// Write generated meals and the completed status in one transaction
///
/// Returns `None` without touching any meal row when the job is no longer active.
pub async fn complete(
    pool: &PgPool,
    id: Uuid,
    result: &JobResult,
    writes: &[MealWrite],
    now: DateTime<Utc>,
) -> StoreResult<Option<Job>> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, JobRow>(&format!(
        r#"
        UPDATE generation_jobs
        SET status = 'completed', result = $2, updated_at = $3
        WHERE id = $1 AND status IN ('pending', 'processing')
        RETURNING {JOB_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(Json(result))
    .bind(now)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(row) = row else {
        tx.rollback().await?;
        return Ok(None);
    };

    for write in writes {
        plan_repository::upsert_meal(&mut *tx, write, id, now).await?;
    }

    tx.commit().await?;

    Job::try_from(row).map(Some)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    owner_id: Uuid,
    mode: String,
    target: serde_json::Value,
    constraints: serde_json::Value,
    status: String,
    progress: Option<serde_json::Value>,
    result: Option<serde_json::Value>,
    error_message: Option<String>,
    containers: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = StoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let status: JobStatus = row.status.parse().map_err(StoreError::Corrupt)?;

        Ok(Job {
            id: row.id,
            owner: row.owner_id,
            mode: row.mode.parse().map_err(StoreError::Corrupt)?,
            target: serde_json::from_value(row.target)?,
            constraints: serde_json::from_value(row.constraints)?,
            status,
            progress: row.progress.map(serde_json::from_value).transpose()?,
            result: row.result.map(serde_json::from_value).transpose()?,
            error_message: row.error_message,
            containers: serde_json::from_value(row.containers)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
