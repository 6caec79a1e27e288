use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mealplan_orchestrator::config::{Config, StorageBackend};
use mealplan_orchestrator::repository::{InMemoryStore, PgStore};
use mealplan_orchestrator::state::AppState;
use mealplan_orchestrator::{api, db};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mealplan_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Mealplan Orchestrator...");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    tracing::info!(
        "Worker at {}, stale timeout {}s, duplicate policy {:?}",
        config.worker_url,
        config.stale_timeout.as_secs(),
        config.duplicate_policy
    );

    let state = match &config.storage {
        StorageBackend::Postgres { database_url } => {
            tracing::info!("Connecting to database...");

            let pool = db::create_pool(database_url)
                .await
                .context("Failed to create database pool")?;

            tracing::info!("Database connection pool created");

            db::run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;

            let store = Arc::new(PgStore::new(pool));
            AppState::new(config.clone(), store.clone(), store)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; jobs and plans are lost on restart");
            let store = Arc::new(InMemoryStore::new());
            AppState::new(config.clone(), store.clone(), store)
        }
    }
    .context("Failed to build worker client")?;

    let dispatcher = state.dispatcher.clone();

    // Build router with all API endpoints
    let app = api::create_router(state);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!(
        "Waiting up to {}s for {} in-flight dispatches",
        config.shutdown_grace.as_secs(),
        dispatcher.in_flight()
    );

    if dispatcher.shutdown(config.shutdown_grace).await {
        tracing::info!("Orchestrator stopped");
    } else {
        tracing::warn!("Shutdown grace period elapsed with dispatches still running");
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
