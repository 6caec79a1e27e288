//! Health Check API Handler

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::state::AppState;

/// GET /health
/// Liveness plus the number of dispatches still in flight
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "dispatches_in_flight": state.dispatcher.in_flight(),
    }))
}
