//! Materialized workflow definition and its provenance manifest

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::conversation::ConversationId;
use crate::domain::storage::{StorageEntity, StorageKey};
use crate::domain::DomainError;

/// Version tag of the manifest layout
pub const MANIFEST_SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowId(String);

impl WorkflowId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Parses an id received from outside, which must be a UUID
    pub fn parse(id: &str) -> Result<Self, DomainError> {
        uuid::Uuid::parse_str(id)
            .map(|uuid| Self(uuid.to_string()))
            .map_err(|_| DomainError::validation(format!("Invalid workflow ID '{}'", id)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StorageKey for WorkflowId {
    fn as_str(&self) -> &str {
        &self.0
    }
}

/// Software component that took part in producing a definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRef {
    pub name: String,
    pub version: String,
}

impl ComponentRef {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Records what produced a definition, for audit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceManifest {
    pub schema_version: String,
    pub template_id: String,
    pub template_version: String,
    pub model_ids: Vec<String>,
    pub components: Vec<ComponentRef>,
    pub jurisdiction: String,
    pub audit_trace_id: String,
    pub generated_at: DateTime<Utc>,
}

/// Concrete, costed workflow ready for the execution engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: WorkflowId,
    pub name: String,
    pub template_id: String,
    pub conversation_id: ConversationId,
    /// Values the placeholders were resolved from
    pub inputs: BTreeMap<String, Value>,
    /// Execution graph with every declared placeholder substituted
    pub payload: Value,
    pub estimated_cost: f64,
    pub currency: String,
    pub estimated_duration_seconds: u64,
    pub manifest: ProvenanceManifest,
    pub created_at: DateTime<Utc>,
}

impl StorageEntity for WorkflowDefinition {
    type Key = WorkflowId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}
