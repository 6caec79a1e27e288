//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Services orchestrate between the stores, the change feed and the worker.

pub mod dispatch;
pub mod job;
pub mod notifier;
pub mod reclaimer;
pub mod slot_resolver;
pub mod submission;

// Re-export for convenience
pub use job as job_service;
pub use submission as submission_service;
