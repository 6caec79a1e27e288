//! Shared application state handed to every handler

use std::sync::Arc;

use crate::config::Config;
use crate::repository::{InMemoryStore, JobStore, PlanStore};
use crate::service::dispatch::Dispatcher;
use crate::service::notifier::JobEvents;

#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<dyn JobStore>,
    pub plans: Arc<dyn PlanStore>,
    pub dispatcher: Dispatcher,
    pub events: JobEvents,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        config: Config,
        jobs: Arc<dyn JobStore>,
        plans: Arc<dyn PlanStore>,
    ) -> Result<Self, reqwest::Error> {
        let events = JobEvents::new(config.event_channel_capacity);
        let dispatcher = Dispatcher::new(
            &config.worker_url,
            config.dispatch_timeout,
            jobs.clone(),
            events.clone(),
        )?;

        Ok(Self {
            jobs,
            plans,
            dispatcher,
            events,
            config: Arc::new(config),
        })
    }

    /// State over a fresh in-memory store, which is also returned for inspection
    pub fn in_memory(config: Config) -> Result<(Self, Arc<InMemoryStore>), reqwest::Error> {
        let store = Arc::new(InMemoryStore::new());
        let state = Self::new(config, store.clone(), store.clone())?;
        Ok((state, store))
    }
}
