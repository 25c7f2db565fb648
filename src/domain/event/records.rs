//! Bookkeeping records written by the workers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entity::{DomainEvent, EventId, EventType};
use crate::domain::storage::{RecordKey, StorageEntity};

/// Last stream entry a consumer group has fully processed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumerCursor {
    pub consumer: RecordKey,
    pub last_entry_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ConsumerCursor {
    pub fn new(consumer: impl Into<String>) -> Self {
        Self {
            consumer: RecordKey::new(consumer),
            last_entry_id: None,
            updated_at: Utc::now(),
        }
    }

    pub fn advance(&mut self, entry_id: impl Into<String>) {
        self.last_entry_id = Some(entry_id.into());
        self.updated_at = Utc::now();
    }
}

impl StorageEntity for ConsumerCursor {
    type Key = RecordKey;

    fn key(&self) -> &Self::Key {
        &self.consumer
    }
}

/// Marker that a handler already processed an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedEvent {
    /// `{handler}:{event_id}`
    pub key: RecordKey,
    pub handler: String,
    pub event_id: EventId,
    pub processed_at: DateTime<Utc>,
}

impl ProcessedEvent {
    pub fn key_for(handler: &str, event_id: &EventId) -> RecordKey {
        RecordKey::composite(&[handler, event_id.as_str()])
    }

    pub fn new(handler: &str, event_id: &EventId) -> Self {
        Self {
            key: Self::key_for(handler, event_id),
            handler: handler.to_string(),
            event_id: event_id.clone(),
            processed_at: Utc::now(),
        }
    }
}

impl StorageEntity for ProcessedEvent {
    type Key = RecordKey;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

/// Audit log line for a domain event, keyed by event id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub event_id: EventId,
    pub event_type: EventType,
    pub partition_key: String,
    pub payload: Value,
    pub emitted_at: DateTime<Utc>,
    pub recorded_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn from_event(event: &DomainEvent) -> Self {
        Self {
            event_id: event.id.clone(),
            event_type: event.event_type,
            partition_key: event.partition_key.clone(),
            payload: event.payload.clone(),
            emitted_at: event.emitted_at,
            recorded_at: Utc::now(),
        }
    }
}

impl StorageEntity for AuditRecord {
    type Key = EventId;

    fn key(&self) -> &Self::Key {
        &self.event_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processed_event_key() {
        let event_id = EventId::new("evt-1");
        let marker = ProcessedEvent::new("audit_log", &event_id);

        assert_eq!(marker.key, RecordKey::new("audit_log:evt-1"));
        assert_eq!(ProcessedEvent::key_for("audit_log", &event_id), marker.key);
    }

    #[test]
    fn test_cursor_advance() {
        let mut cursor = ConsumerCursor::new("workers");
        assert!(cursor.last_entry_id.is_none());

        cursor.advance("3-0");
        assert_eq!(cursor.last_entry_id.as_deref(), Some("3-0"));
    }
}
