//! Application state.

use stagerunner_config::SchedulerConfig;
use stagerunner_db::Store;
use stagerunner_scheduler::RunOrchestrator;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub orchestrator: Arc<RunOrchestrator>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, orchestrator: Arc<RunOrchestrator>) -> Self {
        Self {
            store,
            orchestrator,
        }
    }

    /// State backed by `store` with a simulated-stage orchestrator.
    pub fn from_config(store: Arc<dyn Store>, config: &SchedulerConfig) -> Self {
        let orchestrator = Arc::new(RunOrchestrator::from_config(store.clone(), config));
        Self::new(store, orchestrator)
    }
}
