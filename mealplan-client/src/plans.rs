//! Plan-related API endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use chrono::NaiveDate;
use mealplan_core::domain::plan::DayPlan;
use reqwest::Method;

impl OrchestratorClient {
    /// Get a day with its stored meals
    ///
    /// A day nothing was ever generated for yields a not-found error.
    pub async fn get_day_plan(&self, date: NaiveDate) -> Result<DayPlan> {
        let response = self
            .scoped(Method::GET, &format!("/plan/day/{}", date))?
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Like `get_day_plan`, but a missing day is `None`
    pub async fn find_day_plan(&self, date: NaiveDate) -> Result<Option<DayPlan>> {
        match self.get_day_plan(date).await {
            Ok(plan) => Ok(Some(plan)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
