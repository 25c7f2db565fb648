//! Forwards trigger requests to the execution engine

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::engine::{EngineActivation, ExecutionEngine};
use crate::domain::event::{DomainEvent, EventHandler, EventType, TriggerRequestedPayload};
use crate::domain::storage::Storage;
use crate::domain::workflow::{WorkflowDefinition, WorkflowId};
use crate::domain::DomainError;

pub struct ExecutionTriggerHandler {
    workflows: Arc<dyn Storage<WorkflowDefinition>>,
    activations: Arc<dyn Storage<EngineActivation>>,
    engine: Arc<dyn ExecutionEngine>,
}

impl fmt::Debug for ExecutionTriggerHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionTriggerHandler")
            .field("engine", &self.engine.name())
            .finish()
    }
}

impl ExecutionTriggerHandler {
    pub fn new(
        workflows: Arc<dyn Storage<WorkflowDefinition>>,
        activations: Arc<dyn Storage<EngineActivation>>,
        engine: Arc<dyn ExecutionEngine>,
    ) -> Self {
        Self {
            workflows,
            activations,
            engine,
        }
    }
}

#[async_trait]
impl EventHandler for ExecutionTriggerHandler {
    fn name(&self) -> &'static str {
        "execution_trigger"
    }

    fn handles(&self, event_type: EventType) -> bool {
        event_type == EventType::WorkflowTriggerRequested
    }

    async fn handle(&self, event: &DomainEvent) -> Result<(), DomainError> {
        let payload: TriggerRequestedPayload = event.payload_as()?;
        let workflow_id = WorkflowId::parse(&payload.workflow_id)?;

        // the engine is not idempotent, a stored activation means it already ran
        if self.activations.exists(&workflow_id).await? {
            debug!(workflow_id = %workflow_id, "Workflow already handed to the engine");
            return Ok(());
        }

        let definition = self.workflows.get(&workflow_id).await?.ok_or_else(|| {
            DomainError::not_found(format!("Workflow '{}' not found", workflow_id))
        })?;

        let handle = self.engine.activate(&definition).await?;

        info!(
            workflow_id = %workflow_id,
            template_id = %definition.template_id,
            engine = self.engine.name(),
            handle = %handle,
            "Workflow activated on engine"
        );

        match self
            .activations
            .create(EngineActivation::pending(workflow_id, handle))
            .await
        {
            Ok(_) | Err(DomainError::Conflict { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
