//! Durable per-conversation record

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::status::{check_transition, ConversationStatus};
use super::trace::{TraceAction, TraceEntry};
use crate::domain::inference::TokenUsage;
use crate::domain::storage::{StorageEntity, StorageKey};
use crate::domain::track::DomainTrack;
use crate::domain::DomainError;

/// Maximum length for conversation IDs
pub const MAX_CONVERSATION_ID_LENGTH: usize = 128;

static CONVERSATION_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").unwrap());

/// Conversation identifier, a UUID unless the caller supplies its own
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();

        if id.is_empty() || id.len() > MAX_CONVERSATION_ID_LENGTH {
            return Err(DomainError::validation(format!(
                "Conversation ID must be 1 to {} characters",
                MAX_CONVERSATION_ID_LENGTH
            )));
        }

        if !CONVERSATION_ID_PATTERN.is_match(&id) {
            return Err(DomainError::validation(format!(
                "Invalid conversation ID format '{}'",
                id
            )));
        }

        Ok(Self(id))
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ConversationId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ConversationId> for String {
    fn from(id: ConversationId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StorageKey for ConversationId {
    fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Everything the orchestrator knows about one conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub id: ConversationId,
    #[serde(default)]
    pub turns: Vec<Turn>,
    /// Resolved input name to normalized value
    #[serde(default)]
    pub findings: BTreeMap<String, Value>,
    #[serde(default)]
    pub trace: Vec<TraceEntry>,
    #[serde(default)]
    pub active_domain: Option<DomainTrack>,
    #[serde(default)]
    pub status: ConversationStatus,
    #[serde(default)]
    pub template_id: Option<String>,
    /// Input the last assistant turn asked for
    #[serde(default)]
    pub pending_field: Option<String>,
    /// Template ids offered in the last clarification
    #[serde(default)]
    pub candidates: Vec<String>,
    /// Workflow instance counter, bumped after each activation
    #[serde(default)]
    pub instance: u32,
    #[serde(default)]
    pub workflow_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn new(id: ConversationId) -> Self {
        let now = Utc::now();

        Self {
            id,
            turns: Vec::new(),
            findings: BTreeMap::new(),
            trace: Vec::new(),
            active_domain: None,
            status: ConversationStatus::Init,
            template_id: None,
            pending_field: None,
            candidates: Vec::new(),
            instance: 0,
            workflow_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn push_turn(&mut self, role: TurnRole, text: impl Into<String>) {
        self.turns.push(Turn {
            role,
            text: text.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn last_assistant_text(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|turn| turn.role == TurnRole::Assistant)
            .map(|turn| turn.text.as_str())
    }

    /// Moves to `next`, rejecting transitions the state machine forbids
    pub fn transition(&mut self, next: ConversationStatus) -> Result<(), DomainError> {
        check_transition(&self.status, &next)?;
        self.status = next;
        Ok(())
    }

    /// Appends a trace entry with the next sequence number
    pub fn record(
        &mut self,
        action: TraceAction,
        resolved_fields: Vec<String>,
        model_ids: Vec<String>,
        usage: TokenUsage,
    ) -> u64 {
        let sequence = self.trace.last().map(|e| e.sequence + 1).unwrap_or(1);
        let timestamp = Utc::now();

        self.trace.push(TraceEntry {
            sequence,
            action,
            resolved_fields,
            model_ids,
            usage,
            timestamp,
        });
        self.updated_at = timestamp;

        sequence
    }

    /// Resets per-instance fields after an activation; turns and trace are kept
    pub fn start_new_instance(&mut self) -> Result<(), DomainError> {
        self.transition(ConversationStatus::Init)?;
        self.instance += 1;
        self.findings.clear();
        self.template_id = None;
        self.active_domain = None;
        self.pending_field = None;
        self.candidates.clear();
        Ok(())
    }

    /// Model ids invoked over the whole trace, deduplicated in first-use order
    pub fn model_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();

        for id in self.trace.iter().flat_map(|entry| entry.model_ids.iter()) {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }

        ids
    }

    pub fn total_usage(&self) -> TokenUsage {
        self.trace.iter().fold(TokenUsage::default(), |mut acc, entry| {
            acc.add(entry.usage);
            acc
        })
    }

    pub fn count_actions(&self, action: &TraceAction) -> usize {
        self.trace.iter().filter(|e| &e.action == action).count()
    }
}

impl StorageEntity for ConversationState {
    type Key = ConversationId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ConversationState {
        ConversationState::new(ConversationId::new("conv-1").unwrap())
    }

    #[test]
    fn test_conversation_id_validation() {
        assert!(ConversationId::new("conv-1").is_ok());
        assert!(ConversationId::new("").is_err());
        assert!(ConversationId::new("has space").is_err());
        assert!(ConversationId::new("a".repeat(129)).is_err());
        assert!(ConversationId::new(ConversationId::generate().to_string()).is_ok());
    }

    #[test]
    fn test_record_increments_sequence() {
        let mut state = state();

        let first = state.record(
            TraceAction::AskedSlot {
                field: "wilaya".to_string(),
            },
            vec![],
            vec!["claude-sonnet-4".to_string()],
            TokenUsage::new(10, 2),
        );
        let second = state.record(
            TraceAction::Ready {
                template_id: "t".to_string(),
            },
            vec!["wilaya".to_string()],
            vec!["llama3.1:8b".to_string(), "claude-sonnet-4".to_string()],
            TokenUsage::new(5, 1),
        );

        assert_eq!((first, second), (1, 2));
        assert_eq!(state.model_ids(), vec!["claude-sonnet-4", "llama3.1:8b"]);
        assert_eq!(state.total_usage(), TokenUsage::new(15, 3));
    }

    #[test]
    fn test_last_assistant_text() {
        let mut state = state();
        assert!(state.last_assistant_text().is_none());

        state.push_turn(TurnRole::User, "hi");
        state.push_turn(TurnRole::Assistant, "Which wilaya?");
        state.push_turn(TurnRole::User, "16");

        assert_eq!(state.last_assistant_text(), Some("Which wilaya?"));
    }

    #[test]
    fn test_transition_rejects_invalid() {
        let mut state = state();
        assert!(state.transition(ConversationStatus::Ready).is_err());
        assert_eq!(state.status, ConversationStatus::Init);
        assert!(state.transition(ConversationStatus::Classifying).is_ok());
    }

    #[test]
    fn test_start_new_instance_resets_findings() {
        let mut state = state();
        state.status = ConversationStatus::Activated;
        state.findings.insert("wilaya".to_string(), Value::from("16"));
        state.template_id = Some("t".to_string());
        state.record(
            TraceAction::Activated {
                workflow_id: "w".to_string(),
            },
            vec![],
            vec![],
            TokenUsage::default(),
        );

        state.start_new_instance().unwrap();

        assert_eq!(state.status, ConversationStatus::Init);
        assert_eq!(state.instance, 1);
        assert!(state.findings.is_empty());
        assert!(state.template_id.is_none());
        assert_eq!(state.trace.len(), 1);
    }

    #[test]
    fn test_start_new_instance_requires_activated() {
        let mut state = state();
        state.status = ConversationStatus::Ready;
        assert!(state.start_new_instance().is_err());
    }

    #[test]
    fn test_serialization_round_trip_keeps_status() {
        let mut state = state();
        state.status = ConversationStatus::SlotFilling;
        state.pending_field = Some("phone".to_string());

        let json = serde_json::to_string(&state).unwrap();
        let restored: ConversationState = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, state);
    }
}
