//! Workflow service - read side of materialized workflows and their engine runs

use std::sync::Arc;

use serde::Serialize;

use crate::domain::conversation::ConversationId;
use crate::domain::engine::EngineActivation;
use crate::domain::storage::Storage;
use crate::domain::workflow::{WorkflowDefinition, WorkflowId};
use crate::domain::DomainError;
use crate::infrastructure::engine::{EngineCallback, ExecutionStatusTracker};

/// A workflow definition with its engine activation, if the trigger ran
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowStatusView {
    pub workflow: WorkflowDefinition,
    pub activation: Option<EngineActivation>,
}

#[derive(Debug)]
pub struct WorkflowService {
    workflows: Arc<dyn Storage<WorkflowDefinition>>,
    tracker: ExecutionStatusTracker,
}

impl WorkflowService {
    pub fn new(
        workflows: Arc<dyn Storage<WorkflowDefinition>>,
        activations: Arc<dyn Storage<EngineActivation>>,
    ) -> Self {
        Self {
            workflows,
            tracker: ExecutionStatusTracker::new(activations),
        }
    }

    pub async fn get(&self, id: &str) -> Result<WorkflowDefinition, DomainError> {
        let workflow_id = WorkflowId::parse(id)?;

        self.workflows
            .get(&workflow_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Workflow '{}' not found", id)))
    }

    /// Workflows activated from one conversation, oldest first
    pub async fn list_for_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<WorkflowDefinition>, DomainError> {
        let mut workflows: Vec<WorkflowDefinition> = self
            .workflows
            .list()
            .await?
            .into_iter()
            .filter(|w| &w.conversation_id == conversation_id)
            .collect();

        workflows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(workflows)
    }

    pub async fn status(&self, id: &str) -> Result<WorkflowStatusView, DomainError> {
        let workflow = self.get(id).await?;
        let activation = self.tracker.get(&workflow.id).await?;

        Ok(WorkflowStatusView {
            workflow,
            activation,
        })
    }

    pub async fn apply_engine_callback(
        &self,
        callback: EngineCallback,
    ) -> Result<EngineActivation, DomainError> {
        self.tracker.apply_callback(callback).await
    }
}
