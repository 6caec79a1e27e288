//! Mealplan HTTP Client
//!
//! A type-safe HTTP client for the Mealplan orchestrator API, shared by the
//! CLI and the generation worker.
//!
//! # Example
//!
//! ```no_run
//! use mealplan_client::{JobOutcome, JobWatcher, OrchestratorClient};
//! use mealplan_core::domain::job::{Constraints, JobMode, JobTarget};
//! use mealplan_core::domain::slot::{MealType, SlotRef};
//! use mealplan_core::dto::job::SubmitJob;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = OrchestratorClient::new("http://localhost:8080").with_owner(Uuid::new_v4());
//!
//!     let date = chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
//!     let accepted = client
//!         .submit_job(SubmitJob {
//!             mode: JobMode::Single,
//!             target: JobTarget::Slot(SlotRef::new(date, MealType::Dinner)),
//!             constraints: Constraints::default(),
//!         })
//!         .await?;
//!
//!     let outcome = JobWatcher::new(client)
//!         .watch(accepted.job_id, |update| println!("{:?}", update.progress))
//!         .await?;
//!
//!     if let JobOutcome::Completed(result) = outcome {
//!         println!("Generated {} meals", result.meals.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
mod jobs;
mod plans;
pub mod watch;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use watch::{JobOutcome, JobWatcher};

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Header naming the owner a request acts for
pub const OWNER_HEADER: &str = "x-owner-id";

/// HTTP client for the Mealplan orchestrator API
///
/// Methods are organized into logical groups:
/// - Job submission and reads
/// - Worker lifecycle callbacks (progress, complete, fail)
/// - Plan reads
#[derive(Debug, Clone)]
pub struct OrchestratorClient {
    /// Base URL of the orchestrator (e.g., "http://localhost:8080")
    base_url: String,
    /// Owner sent with every scoped request
    owner: Option<Uuid>,
    /// HTTP client instance
    client: Client,
}

impl OrchestratorClient {
    /// Create a new orchestrator client
    ///
    /// # Example
    /// ```
    /// use mealplan_client::OrchestratorClient;
    ///
    /// let client = OrchestratorClient::new("http://localhost:8080/");
    /// assert_eq!(client.base_url(), "http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new orchestrator client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            owner: None,
            client,
        }
    }

    /// Scope subsequent requests to `owner`
    pub fn with_owner(mut self, owner: Uuid) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Get the base URL of the orchestrator
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn owner(&self) -> Option<Uuid> {
        self.owner
    }

    /// Builds a request carrying the owner header
    fn scoped(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let owner = self.owner.ok_or(ClientError::MissingOwner)?;
        Ok(self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header(OWNER_HEADER, owner.to_string()))
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            return Err(Self::api_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response that returns no content
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        Ok(())
    }

    /// Converts a failed response, preferring the `{"error": ..}` message
    async fn api_error(response: reqwest::Response) -> ClientError {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let message = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
            .unwrap_or(text);

        ClientError::api_error(status, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = OrchestratorClient::new("http://localhost:8080/");
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.owner(), None);
    }

    #[test]
    fn test_scoped_request_requires_owner() {
        let client = OrchestratorClient::new("http://localhost:8080");
        assert!(matches!(
            client.scoped(Method::GET, "/job/pending"),
            Err(ClientError::MissingOwner)
        ));

        let owner = Uuid::new_v4();
        let request = client
            .with_owner(owner)
            .scoped(Method::GET, "/job/pending")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.url().as_str(), "http://localhost:8080/job/pending");
        assert_eq!(
            request.headers().get(OWNER_HEADER).unwrap(),
            owner.to_string().as_str()
        );
    }
}
