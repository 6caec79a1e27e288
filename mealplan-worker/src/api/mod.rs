//! API Module
//!
//! One route per generation mode. Each call runs the job to a terminal
//! state before answering.

pub mod error;
pub mod generate;

use axum::{
    Json, Router,
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use crate::state::WorkerState;

pub fn create_router(state: WorkerState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/generate/single", post(generate::generate_single))
        .route("/generate/weekly", post(generate::generate_weekly))
        .route("/generate/multi-slot", post(generate::generate_multi_slot))
        .route("/generate/regenerate", post(generate::generate_regenerate))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// GET /health
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
