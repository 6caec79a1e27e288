//! Core domain types
//!
//! This module contains the structures shared across the mealplan services.
//! The orchestrator persists them, the worker produces content for them and
//! the client reads them back.

pub mod job;
pub mod plan;
pub mod slot;
