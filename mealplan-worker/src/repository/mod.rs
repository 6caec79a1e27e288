//! Repository layer
//!
//! Repositories are thin wrappers over the orchestrator API. The generation
//! service only sees the traits, so tests swap in recording fakes.

mod jobs;
mod plans;

pub use jobs::{HttpJobRepository, JobRepository};
pub use plans::{HttpPlanRepository, PlanRepository};
