//! Mealplan Orchestrator
//!
//! Accepts generation requests, records them as jobs, dispatches them to the
//! generation worker without waiting, and serves job state back to clients.
//!
//! Layers:
//! - `api`: HTTP handlers and routing
//! - `service`: submission, dispatch, slot resolution, stale reclamation, notification
//! - `repository`: job and plan stores (Postgres or in-memory)

pub mod api;
pub mod config;
pub mod db;
pub mod repository;
pub mod service;
pub mod state;
