//! Orchestrator configuration
//!
//! Defines the storage backend, worker connection, and the timeouts that
//! govern dispatch and stale-job reclamation.

use mealplan_core::dto::worker::{DEFAULT_WORKER_JOB_TIMEOUT, WORKER_CALLBACK_ALLOWANCE};
use std::str::FromStr;
use std::time::Duration;

/// Where job and plan rows live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres { database_url: String },
    /// Process-local store, lost on restart
    Memory,
}

/// What submission does when an active job already covers an overlapping target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Refuse the new job and point at the existing one
    Reject,
    /// Accept the new job and report the overlap
    Allow,
}

impl FromStr for DuplicatePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(DuplicatePolicy::Reject),
            "allow" => Ok(DuplicatePolicy::Allow),
            other => anyhow::bail!("unknown duplicate policy: {}", other),
        }
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to
    pub bind_addr: String,

    pub storage: StorageBackend,

    /// Base URL of the generation worker (e.g., "http://localhost:8090")
    pub worker_url: String,

    /// How long an active job may go without an update before it is reclaimed
    pub stale_timeout: Duration,

    /// Upper bound on a single dispatch call, including the worker's run
    pub dispatch_timeout: Duration,

    pub duplicate_policy: DuplicatePolicy,

    /// Buffered job updates per change-feed subscriber
    pub event_channel_capacity: usize,

    /// How long shutdown waits for in-flight dispatches
    pub shutdown_grace: Duration,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(worker_url: String, storage: StorageBackend) -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            storage,
            worker_url,
            stale_timeout: Duration::from_secs(20 * 60),
            dispatch_timeout: DEFAULT_WORKER_JOB_TIMEOUT + WORKER_CALLBACK_ALLOWANCE,
            duplicate_policy: DuplicatePolicy::Reject,
            event_channel_capacity: 256,
            shutdown_grace: Duration::from_secs(30),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - STORAGE_BACKEND (optional, `postgres` or `memory`, default: postgres)
    /// - DATABASE_URL (required for postgres)
    /// - ORCHESTRATOR_BIND_ADDR (optional, default: 0.0.0.0:8080)
    /// - WORKER_URL (optional, default: http://localhost:8090)
    /// - STALE_TIMEOUT_SECS (optional, default: 1200)
    /// - DISPATCH_TIMEOUT_SECS (optional, default: 960)
    /// - DUPLICATE_POLICY (optional, `reject` or `allow`, default: reject)
    /// - EVENT_CHANNEL_CAPACITY (optional, default: 256)
    /// - SHUTDOWN_GRACE_SECS (optional, default: 30)
    ///
    /// Keep DISPATCH_TIMEOUT_SECS above the worker's JOB_TIMEOUT_SECS plus the
    /// time its final callback takes. A dispatch that times out first fails
    /// the job with `dispatch_timeout`, and the worker's late result is
    /// rejected. STALE_TIMEOUT_SECS should stay above both.
    pub fn from_env() -> anyhow::Result<Self> {
        let storage = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .as_str()
        {
            "memory" => StorageBackend::Memory,
            "postgres" => StorageBackend::Postgres {
                database_url: std::env::var("DATABASE_URL")
                    .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable not set"))?,
            },
            other => anyhow::bail!("unknown STORAGE_BACKEND: {}", other),
        };

        let worker_url =
            std::env::var("WORKER_URL").unwrap_or_else(|_| "http://localhost:8090".to_string());

        let mut config = Self::new(worker_url, storage);

        if let Ok(addr) = std::env::var("ORCHESTRATOR_BIND_ADDR") {
            config.bind_addr = addr;
        }

        config.stale_timeout = env_secs("STALE_TIMEOUT_SECS").unwrap_or(config.stale_timeout);
        config.dispatch_timeout =
            env_secs("DISPATCH_TIMEOUT_SECS").unwrap_or(config.dispatch_timeout);
        config.shutdown_grace = env_secs("SHUTDOWN_GRACE_SECS").unwrap_or(config.shutdown_grace);

        if let Ok(policy) = std::env::var("DUPLICATE_POLICY") {
            config.duplicate_policy = policy.parse()?;
        }

        config.event_channel_capacity = std::env::var("EVENT_CHANNEL_CAPACITY")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(config.event_channel_capacity);

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.worker_url.starts_with("http://") && !self.worker_url.starts_with("https://") {
            anyhow::bail!("worker_url must start with http:// or https://");
        }

        if let StorageBackend::Postgres { database_url } = &self.storage {
            if database_url.is_empty() {
                anyhow::bail!("database_url cannot be empty");
            }
        }

        if self.stale_timeout.is_zero() {
            anyhow::bail!("stale_timeout must be greater than 0");
        }

        if self.dispatch_timeout.is_zero() {
            anyhow::bail!("dispatch_timeout must be greater than 0");
        }

        if self.event_channel_capacity == 0 {
            anyhow::bail!("event_channel_capacity must be greater than 0");
        }

        Ok(())
    }

    /// Stale timeout as a chrono duration for timestamp arithmetic
    pub fn stale_after(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.stale_timeout).unwrap_or(chrono::Duration::MAX)
    }
}

fn env_secs(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> Config {
        Config::new("http://localhost:8090".to_string(), StorageBackend::Memory)
    }

    #[test]
    fn test_default_config() {
        let config = memory_config();
        assert_eq!(config.stale_timeout, Duration::from_secs(1200));
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Reject);
        assert!(config.dispatch_timeout < config.stale_timeout);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_dispatch_outlasts_worker_run_and_callback() {
        let config = memory_config();
        assert_eq!(config.dispatch_timeout, Duration::from_secs(960));
        assert!(config.dispatch_timeout >= DEFAULT_WORKER_JOB_TIMEOUT + WORKER_CALLBACK_ALLOWANCE);
        assert!(config.dispatch_timeout > DEFAULT_WORKER_JOB_TIMEOUT);
    }

    #[test]
    fn test_config_validation() {
        let mut config = memory_config();

        config.worker_url = "localhost:8090".to_string();
        assert!(config.validate().is_err());

        config.worker_url = "http://worker:8090".to_string();
        config.stale_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        config.stale_timeout = Duration::from_secs(60);
        config.storage = StorageBackend::Postgres {
            database_url: String::new(),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_policy_parsing() {
        assert_eq!(
            "Allow".parse::<DuplicatePolicy>().unwrap(),
            DuplicatePolicy::Allow
        );
        assert_eq!(
            "reject".parse::<DuplicatePolicy>().unwrap(),
            DuplicatePolicy::Reject
        );
        assert!("maybe".parse::<DuplicatePolicy>().is_err());
    }

    #[test]
    fn test_stale_after_matches_timeout() {
        let config = memory_config();
        assert_eq!(config.stale_after(), chrono::Duration::minutes(20));
    }
}
