//! Mealplan Worker
//!
//! A stateless service that generates meal content for one job per request.
//!
//! Architecture:
//! - Configuration: Load settings from environment
//! - Model: OpenAI-compatible chat completions client
//! - Repositories: HTTP callbacks to the orchestrator (jobs, plans)
//! - Services: Batch generation, output repair, terminal writes
//! - API: One route per generation mode
//!
//! The orchestrator dispatches each job here and forgets about it. The
//! worker reports progress, then completes or fails the job itself.

mod api;
mod config;
mod extract;
mod instruction;
mod model;
mod repository;
mod service;
mod state;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::model::ChatCompletionsModel;
use crate::repository::{HttpJobRepository, HttpPlanRepository};
use crate::service::GenerationService;
use crate::state::WorkerState;
use mealplan_client::OrchestratorClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mealplan_worker=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Mealplan Worker");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    info!(
        "Loaded configuration: orchestrator_url={}, model={} at {}",
        config.orchestrator_url, config.model_name, config.model_base_url
    );

    let model = ChatCompletionsModel::new(
        config.model_base_url.clone(),
        config.model_api_key.clone(),
        config.model_name.clone(),
        config.model_timeout,
    )
    .context("Failed to build model client")?;

    let client = OrchestratorClient::new(config.orchestrator_url.clone());

    let generation = GenerationService::new(
        Arc::new(model),
        Arc::new(HttpJobRepository::new(client.clone())),
        Arc::new(HttpPlanRepository::new(client)),
        config.max_parse_retries,
        config.job_timeout,
    );

    let app = api::create_router(WorkerState::new(generation));

    info!(
        "Listening on {} (job timeout {}s, parse retries {})",
        config.bind_addr,
        config.job_timeout.as_secs(),
        config.max_parse_retries
    );

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Worker stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
