//! Domain events

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::domain::storage::StorageKey;
use crate::domain::workflow::WorkflowDefinition;
use crate::domain::DomainError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StorageKey for EventId {
    fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    WorkflowCreated,
    WorkflowTriggerRequested,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WorkflowCreated => "workflow_created",
            Self::WorkflowTriggerRequested => "workflow_trigger_requested",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "workflow_created" => Ok(Self::WorkflowCreated),
            "workflow_trigger_requested" => Ok(Self::WorkflowTriggerRequested),
            other => Err(DomainError::validation(format!(
                "Unknown event type '{}'",
                other
            ))),
        }
    }
}

/// Immutable fact published to the event stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    pub id: EventId,
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Conversation id; events sharing it keep their relative order
    pub partition_key: String,
    pub payload: Value,
    pub emitted_at: DateTime<Utc>,
}

impl DomainEvent {
    pub fn new(event_type: EventType, partition_key: impl Into<String>, payload: Value) -> Self {
        Self {
            id: EventId::generate(),
            event_type,
            partition_key: partition_key.into(),
            payload,
            emitted_at: Utc::now(),
        }
    }

    pub fn workflow_created(definition: &WorkflowDefinition) -> Result<Self, DomainError> {
        let payload = WorkflowCreatedPayload {
            workflow_id: definition.id.to_string(),
            conversation_id: definition.conversation_id.to_string(),
            template_id: definition.template_id.clone(),
            name: definition.name.clone(),
            estimated_cost: definition.estimated_cost,
            currency: definition.currency.clone(),
            estimated_duration_seconds: definition.estimated_duration_seconds,
            audit_trace_id: definition.manifest.audit_trace_id.clone(),
        };

        Ok(Self::new(
            EventType::WorkflowCreated,
            definition.conversation_id.as_str(),
            to_payload(&payload)?,
        ))
    }

    pub fn workflow_trigger_requested(
        definition: &WorkflowDefinition,
    ) -> Result<Self, DomainError> {
        let payload = TriggerRequestedPayload {
            workflow_id: definition.id.to_string(),
            conversation_id: definition.conversation_id.to_string(),
            template_id: definition.template_id.clone(),
        };

        Ok(Self::new(
            EventType::WorkflowTriggerRequested,
            definition.conversation_id.as_str(),
            to_payload(&payload)?,
        ))
    }

    /// Decodes the payload into its typed form
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, DomainError> {
        serde_json::from_value(self.payload.clone()).map_err(|e| {
            DomainError::validation(format!(
                "Malformed {} payload in event '{}': {}",
                self.event_type, self.id, e
            ))
        })
    }
}

fn to_payload<T: Serialize>(payload: &T) -> Result<Value, DomainError> {
    serde_json::to_value(payload)
        .map_err(|e| DomainError::internal(format!("Failed to serialize event payload: {}", e)))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowCreatedPayload {
    pub workflow_id: String,
    pub conversation_id: String,
    pub template_id: String,
    pub name: String,
    pub estimated_cost: f64,
    pub currency: String,
    pub estimated_duration_seconds: u64,
    pub audit_trace_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRequestedPayload {
    pub workflow_id: String,
    pub conversation_id: String,
    pub template_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_type_round_trip() {
        for event_type in [EventType::WorkflowCreated, EventType::WorkflowTriggerRequested] {
            assert_eq!(event_type.as_str().parse::<EventType>().unwrap(), event_type);
        }
        assert!("workflow_deleted".parse::<EventType>().is_err());
    }

    #[test]
    fn test_event_serializes_with_type_field() {
        let event = DomainEvent::new(EventType::WorkflowCreated, "conv-1", json!({"a": 1}));
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], json!("workflow_created"));
        assert_eq!(json["partition_key"], json!("conv-1"));
        assert!(json["emitted_at"].is_string());
    }

    #[test]
    fn test_payload_as_reports_malformed_payload() {
        let event = DomainEvent::new(
            EventType::WorkflowTriggerRequested,
            "conv-1",
            json!({"workflow_id": "w"}),
        );

        assert!(event.payload_as::<TriggerRequestedPayload>().is_err());
    }
}
