//! Engine status reports

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::domain::engine::{EngineActivation, EngineRunStatus};
use crate::domain::storage::Storage;
use crate::domain::workflow::WorkflowId;
use crate::domain::DomainError;

/// Body of an engine status callback
#[derive(Debug, Clone, Deserialize)]
pub struct EngineCallback {
    pub handle: String,
    /// Resolves the activation directly when the engine echoes it back
    #[serde(default)]
    pub workflow_id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct ExecutionStatusTracker {
    activations: Arc<dyn Storage<EngineActivation>>,
}

impl ExecutionStatusTracker {
    pub fn new(activations: Arc<dyn Storage<EngineActivation>>) -> Self {
        Self { activations }
    }

    pub async fn get(&self, workflow_id: &WorkflowId) -> Result<Option<EngineActivation>, DomainError> {
        self.activations.get(workflow_id).await
    }

    async fn find(&self, callback: &EngineCallback) -> Result<EngineActivation, DomainError> {
        if let Some(id) = &callback.workflow_id {
            let workflow_id = WorkflowId::parse(id)?;

            return self
                .activations
                .get(&workflow_id)
                .await?
                .filter(|a| a.handle.as_str() == callback.handle)
                .ok_or_else(|| {
                    DomainError::not_found(format!(
                        "No activation for workflow '{}' with handle '{}'",
                        id, callback.handle
                    ))
                });
        }

        self.activations
            .list()
            .await?
            .into_iter()
            .find(|a| a.handle.as_str() == callback.handle)
            .ok_or_else(|| {
                DomainError::not_found(format!("No activation with handle '{}'", callback.handle))
            })
    }

    /// Applies a status callback to the matching activation
    pub async fn apply_callback(
        &self,
        callback: EngineCallback,
    ) -> Result<EngineActivation, DomainError> {
        let status: EngineRunStatus = callback.status.parse()?;
        let mut activation = self.find(&callback).await?;

        activation.apply_status(status, callback.error.clone())?;
        let activation = self.activations.save(activation).await?;

        info!(
            workflow_id = %activation.workflow_id,
            handle = %activation.handle,
            status = ?activation.status,
            "Engine status updated"
        );

        Ok(activation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::engine::EngineHandle;
    use crate::domain::storage::mock::MockStorage;

    fn tracker() -> (ExecutionStatusTracker, WorkflowId) {
        let workflow_id = WorkflowId::generate();
        let storage = MockStorage::new()
            .with_entity(EngineActivation::pending(workflow_id.clone(), EngineHandle::new("h-1")));

        (ExecutionStatusTracker::new(Arc::new(storage)), workflow_id)
    }

    fn callback(status: &str) -> EngineCallback {
        EngineCallback {
            handle: "h-1".to_string(),
            workflow_id: None,
            status: status.to_string(),
            error: None,
        }
    }

    #[tokio::test]
    async fn test_callback_by_handle() {
        let (tracker, workflow_id) = tracker();

        let activation = tracker.apply_callback(callback("success")).await.unwrap();

        assert_eq!(activation.status, EngineRunStatus::Succeeded);
        let stored = tracker.get(&workflow_id).await.unwrap().unwrap();
        assert_eq!(stored.status, EngineRunStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_callback_by_workflow_id() {
        let (tracker, workflow_id) = tracker();

        let activation = tracker
            .apply_callback(EngineCallback {
                workflow_id: Some(workflow_id.to_string()),
                error: Some("node 3 crashed".to_string()),
                ..callback("failed")
            })
            .await
            .unwrap();

        assert_eq!(activation.status, EngineRunStatus::Failed);
        assert_eq!(activation.error.as_deref(), Some("node 3 crashed"));
    }

    #[tokio::test]
    async fn test_unknown_handle_and_bad_status() {
        let (tracker, _) = tracker();

        let unknown = tracker
            .apply_callback(EngineCallback {
                handle: "nope".to_string(),
                ..callback("running")
            })
            .await;
        assert!(matches!(unknown, Err(DomainError::NotFound { .. })));

        let bad = tracker.apply_callback(callback("paused")).await;
        assert!(matches!(bad, Err(DomainError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_terminal_state_conflict() {
        let (tracker, _) = tracker();

        tracker.apply_callback(callback("success")).await.unwrap();
        let result = tracker.apply_callback(callback("failed")).await;

        assert!(matches!(result, Err(DomainError::Conflict { .. })));
    }
}
