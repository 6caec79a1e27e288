//! Plan API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::NaiveDate;
use mealplan_core::domain::plan::DayPlan;

use crate::api::error::{ApiError, ApiResult};
use crate::api::owner::Owner;
use crate::state::AppState;

/// GET /plan/day/{date}
/// Get a day container with its meals
pub async fn get_day_plan(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(date): Path<NaiveDate>,
) -> ApiResult<Json<DayPlan>> {
    tracing::debug!("Getting day plan {} for owner {}", date, owner);

    let plan = state
        .plans
        .day_plan(owner, date)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No plan for {}", date)))?;

    Ok(Json(plan))
}
