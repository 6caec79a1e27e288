//! Shared worker state

use std::sync::Arc;

use crate::service::GenerationService;

#[derive(Clone)]
pub struct WorkerState {
    pub generation: Arc<GenerationService>,
}

impl WorkerState {
    pub fn new(generation: GenerationService) -> Self {
        Self {
            generation: Arc::new(generation),
        }
    }
}
