//! Service layer
//!
//! Generation business logic. The service depends only on the model and
//! repository traits, so tests run it against fakes.

pub mod batch;
mod generation;

pub use generation::GenerationService;
