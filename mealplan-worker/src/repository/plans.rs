//! Plans repository

use async_trait::async_trait;
use chrono::NaiveDate;
use mealplan_client::{OrchestratorClient, Result};
use mealplan_core::domain::plan::DayPlan;
use uuid::Uuid;

#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Current content of one day, `None` if nothing was generated for it yet
    async fn fetch_day(&self, owner: Uuid, date: NaiveDate) -> Result<Option<DayPlan>>;
}

pub struct HttpPlanRepository {
    client: OrchestratorClient,
}

impl HttpPlanRepository {
    pub fn new(client: OrchestratorClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PlanRepository for HttpPlanRepository {
    async fn fetch_day(&self, owner: Uuid, date: NaiveDate) -> Result<Option<DayPlan>> {
        self.client
            .clone()
            .with_owner(owner)
            .find_day_plan(date)
            .await
    }
}
