//! Configuration module
//!
//! Handles CLI configuration including orchestrator URL and the owner.

use anyhow::{Result, anyhow};
use mealplan_client::OrchestratorClient;
use uuid::Uuid;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the orchestrator service
    pub orchestrator_url: String,
    /// Owner every request is scoped to
    pub owner: Option<Uuid>,
}

impl Config {
    /// Client scoped to the configured owner
    pub fn client(&self) -> Result<OrchestratorClient> {
        let owner = self
            .owner
            .ok_or_else(|| anyhow!("No owner given; pass --owner or set MEALPLAN_OWNER_ID"))?;
        Ok(OrchestratorClient::new(&self.orchestrator_url).with_owner(owner))
    }
}
