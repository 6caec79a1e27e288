//! Data Transfer Objects for inter-service communication
//!
//! Request and response bodies exchanged between the orchestrator, the
//! generation worker and API clients.

pub mod job;
pub mod worker;
