//! Application state shared by the handlers

use std::sync::Arc;

use crate::infrastructure::services::{OrchestratorService, WorkflowService};
use crate::infrastructure::storage::StorageBackend;

#[derive(Debug, Clone)]
pub struct AppState {
    pub orchestrator: Arc<OrchestratorService>,
    pub workflows: Arc<WorkflowService>,
    /// Probed by `/ready`
    pub storage: StorageBackend,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<OrchestratorService>,
        workflows: Arc<WorkflowService>,
        storage: StorageBackend,
    ) -> Self {
        Self {
            orchestrator,
            workflows,
            storage,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::domain::event::stream_mock::MockEventStream;
    use crate::domain::inference::gateway_mock::ScriptedInferenceGateway;
    use crate::domain::orchestrator::OrchestratorConfig;
    use crate::domain::template::TemplateCatalog;
    use crate::infrastructure::catalog::default_templates;
    use crate::infrastructure::events::{EventDispatcher, EventsConfig};
    use crate::infrastructure::services::OrchestratorDeps;
    use crate::infrastructure::storage::InMemoryStorage;

    /// In-memory state whose gateway replays `gateway`
    pub fn state(gateway: Arc<ScriptedInferenceGateway>) -> AppState {
        let workflows = Arc::new(InMemoryStorage::new());
        let dispatcher = EventDispatcher::new(
            Arc::new(InMemoryStorage::new()),
            Arc::new(MockEventStream::new()),
            &EventsConfig::default(),
        );

        let deps = OrchestratorDeps {
            conversations: Arc::new(InMemoryStorage::new()),
            workflows: workflows.clone(),
            catalog: Arc::new(TemplateCatalog::from_templates(default_templates()).unwrap()),
            gateway,
            dispatcher: Arc::new(dispatcher),
        };

        AppState::new(
            Arc::new(OrchestratorService::new(deps, OrchestratorConfig::default())),
            Arc::new(WorkflowService::new(workflows, Arc::new(InMemoryStorage::new()))),
            StorageBackend::InMemory,
        )
    }
}
