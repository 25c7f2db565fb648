//! External execution engine seam

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::storage::StorageEntity;
use crate::domain::workflow::{WorkflowDefinition, WorkflowId};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Opaque id the engine assigned to an activated workflow
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineHandle(String);

impl EngineHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineRunStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl EngineRunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl FromStr for EngineRunStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" | "new" | "waiting" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "succeeded" | "success" => Ok(Self::Succeeded),
            "failed" | "error" | "crashed" => Ok(Self::Failed),
            other => Err(DomainError::validation(format!(
                "Unknown engine status '{}'",
                other
            ))),
        }
    }
}

/// Record of a workflow handed to the engine, keyed by workflow id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineActivation {
    pub workflow_id: WorkflowId,
    pub handle: EngineHandle,
    pub status: EngineRunStatus,
    pub error: Option<String>,
    pub activated_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EngineActivation {
    pub fn pending(workflow_id: WorkflowId, handle: EngineHandle) -> Self {
        let now = Utc::now();

        Self {
            workflow_id,
            handle,
            status: EngineRunStatus::Pending,
            error: None,
            activated_at: now,
            updated_at: now,
        }
    }

    /// Applies a status report; terminal states are final
    pub fn apply_status(
        &mut self,
        status: EngineRunStatus,
        error: Option<String>,
    ) -> Result<(), DomainError> {
        if self.status.is_terminal() && self.status != status {
            return Err(DomainError::conflict(format!(
                "Workflow '{}' already finished with status {:?}",
                self.workflow_id, self.status
            )));
        }

        self.status = status;
        self.error = error;
        self.updated_at = Utc::now();
        Ok(())
    }
}

impl StorageEntity for EngineActivation {
    type Key = WorkflowId;

    fn key(&self) -> &Self::Key {
        &self.workflow_id
    }
}

/// Minimal activation contract of the external engine
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Creates and activates the workflow graph, returning the engine's handle
    async fn activate(&self, definition: &WorkflowDefinition) -> Result<EngineHandle, DomainError>;

    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!("success".parse::<EngineRunStatus>().unwrap(), EngineRunStatus::Succeeded);
        assert_eq!("error".parse::<EngineRunStatus>().unwrap(), EngineRunStatus::Failed);
        assert!("paused".parse::<EngineRunStatus>().is_err());
    }

    #[test]
    fn test_terminal_status_is_final() {
        let mut activation =
            EngineActivation::pending(WorkflowId::generate(), EngineHandle::new("42"));

        activation.apply_status(EngineRunStatus::Running, None).unwrap();
        activation
            .apply_status(EngineRunStatus::Failed, Some("node crashed".to_string()))
            .unwrap();

        assert!(activation.apply_status(EngineRunStatus::Succeeded, None).is_err());
        assert!(activation
            .apply_status(EngineRunStatus::Failed, Some("again".to_string()))
            .is_ok());
    }
}
