//! Append-only audit trail of committed turns

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::inference::TokenUsage;
use crate::domain::track::DomainTrack;

/// What the orchestrator did on a committed turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceAction {
    /// Asked the user for an input
    AskedSlot { field: String },
    /// A value was extracted but failed validation
    RejectedSlot { field: String, rule: String },
    Clarification { reason: String },
    Conversational { domain: DomainTrack },
    Ready { template_id: String },
    Activated { workflow_id: String },
}

impl TraceAction {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AskedSlot { .. } => "asked_slot",
            Self::RejectedSlot { .. } => "rejected_slot",
            Self::Clarification { .. } => "clarification",
            Self::Conversational { .. } => "conversational",
            Self::Ready { .. } => "ready",
            Self::Activated { .. } => "activated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub sequence: u64,
    pub action: TraceAction,
    /// Inputs resolved on this turn
    #[serde(default)]
    pub resolved_fields: Vec<String>,
    /// Models invoked on this turn, in call order
    #[serde(default)]
    pub model_ids: Vec<String>,
    #[serde(default)]
    pub usage: TokenUsage,
    pub timestamp: DateTime<Utc>,
}
