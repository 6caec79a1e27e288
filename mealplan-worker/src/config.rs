//! Worker configuration
//!
//! Connection settings for the orchestrator and the model endpoint, plus the
//! limits one generation job runs under.

use mealplan_core::dto::worker::DEFAULT_WORKER_JOB_TIMEOUT;
use std::time::Duration;

/// Worker configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to
    pub bind_addr: String,

    /// Orchestrator base URL (e.g., "http://localhost:8080")
    pub orchestrator_url: String,

    /// Base URL of an OpenAI-compatible API (e.g., "https://api.openai.com/v1")
    pub model_base_url: String,

    /// Bearer token for the model API, if it needs one
    pub model_api_key: Option<String>,

    /// Model name sent with every request
    pub model_name: String,

    /// Maximum time for a single model call
    pub model_timeout: Duration,

    /// Extra model calls allowed per batch after unusable output
    pub max_parse_retries: u32,

    /// Maximum time one job may take end to end
    pub job_timeout: Duration,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(orchestrator_url: String, model_base_url: String) -> Self {
        Self {
            bind_addr: "0.0.0.0:8081".to_string(),
            orchestrator_url,
            model_base_url,
            model_api_key: None,
            model_name: "gpt-4o-mini".to_string(),
            model_timeout: Duration::from_secs(120),
            max_parse_retries: 1,
            job_timeout: DEFAULT_WORKER_JOB_TIMEOUT,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - ORCHESTRATOR_URL (required)
    /// - MODEL_BASE_URL (required)
    /// - MODEL_API_KEY (optional)
    /// - MODEL_NAME (optional, default: gpt-4o-mini)
    /// - WORKER_BIND_ADDR (optional, default: 0.0.0.0:8081)
    /// - MODEL_TIMEOUT_SECS (optional, default: 120)
    /// - MAX_PARSE_RETRIES (optional, default: 1)
    /// - JOB_TIMEOUT_SECS (optional, default: 900)
    ///
    /// JOB_TIMEOUT_SECS bounds generation only; the complete or fail callback
    /// runs after it. The orchestrator's DISPATCH_TIMEOUT_SECS must exceed it
    /// by the callback allowance (60s), or the dispatcher fails jobs this
    /// worker is still finishing.
    pub fn from_env() -> anyhow::Result<Self> {
        let orchestrator_url = std::env::var("ORCHESTRATOR_URL")
            .map_err(|_| anyhow::anyhow!("ORCHESTRATOR_URL environment variable not set"))?;

        let model_base_url = std::env::var("MODEL_BASE_URL")
            .map_err(|_| anyhow::anyhow!("MODEL_BASE_URL environment variable not set"))?;

        let mut config = Self::new(orchestrator_url, model_base_url);

        if let Ok(addr) = std::env::var("WORKER_BIND_ADDR") {
            config.bind_addr = addr;
        }

        config.model_api_key = std::env::var("MODEL_API_KEY")
            .ok()
            .filter(|key| !key.is_empty());

        if let Ok(name) = std::env::var("MODEL_NAME") {
            config.model_name = name;
        }

        if let Some(timeout) = env_secs("MODEL_TIMEOUT_SECS") {
            config.model_timeout = timeout;
        }

        if let Some(retries) = std::env::var("MAX_PARSE_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
        {
            config.max_parse_retries = retries;
        }

        if let Some(timeout) = env_secs("JOB_TIMEOUT_SECS") {
            config.job_timeout = timeout;
        }

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, url) in [
            ("orchestrator_url", &self.orchestrator_url),
            ("model_base_url", &self.model_base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("{} must start with http:// or https://", name);
            }
        }

        if self.model_name.is_empty() {
            anyhow::bail!("model_name cannot be empty");
        }

        if self.model_timeout.is_zero() {
            anyhow::bail!("model_timeout must be greater than 0");
        }

        if self.job_timeout < self.model_timeout {
            anyhow::bail!("job_timeout must be at least model_timeout");
        }

        Ok(())
    }
}

fn env_secs(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}
