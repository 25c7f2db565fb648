//! Infrastructure services

mod conversation_locks;
mod orchestrator_service;
mod workflow_service;

pub use conversation_locks::ConversationLocks;
pub use orchestrator_service::{OrchestratorDeps, OrchestratorService};
pub use workflow_service::{WorkflowService, WorkflowStatusView};
