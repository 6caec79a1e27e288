//! Mealplan Core
//!
//! Core types shared by the meal generation services.
//!
//! This crate contains:
//! - Domain types: jobs, slots, and the day/week containers meals are written into
//! - DTOs: Data transfer objects for orchestrator, worker and client communication

pub mod domain;
pub mod dto;
