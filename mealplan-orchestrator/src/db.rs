use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create generation jobs table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS generation_jobs (
            id UUID PRIMARY KEY,
            owner_id UUID NOT NULL,
            mode VARCHAR(32) NOT NULL,
            target JSONB NOT NULL,
            constraints JSONB NOT NULL DEFAULT '{}',
            status VARCHAR(32) NOT NULL,
            progress JSONB,
            result JSONB,
            error_message TEXT,
            containers JSONB NOT NULL DEFAULT '[]',
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create plan weeks table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS plan_weeks (
            id UUID PRIMARY KEY,
            owner_id UUID NOT NULL,
            start_date DATE NOT NULL,
            end_date DATE NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            UNIQUE (owner_id, start_date)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create plan days table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS plan_days (
            id UUID PRIMARY KEY,
            owner_id UUID NOT NULL,
            week_id UUID NOT NULL REFERENCES plan_weeks(id) ON DELETE CASCADE,
            date DATE NOT NULL,
            day_of_week SMALLINT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            UNIQUE (owner_id, date)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create plan meals table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS plan_meals (
            id UUID PRIMARY KEY,
            day_id UUID NOT NULL REFERENCES plan_days(id) ON DELETE CASCADE,
            meal_type VARCHAR(16) NOT NULL,
            content JSONB NOT NULL,
            job_id UUID NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL,
            UNIQUE (day_id, meal_type)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for the pending-jobs read path
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_generation_jobs_owner_status ON generation_jobs(owner_id, status)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_generation_jobs_created_at ON generation_jobs(created_at DESC)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_plan_days_week_id ON plan_days(week_id)")
        .execute(pool)
        .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
