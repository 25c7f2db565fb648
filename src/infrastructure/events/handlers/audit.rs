//! Audit log consumer

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::event::{AuditRecord, DomainEvent, EventHandler, EventType};
use crate::domain::storage::Storage;
use crate::domain::DomainError;

/// Persists one `AuditRecord` per `workflow_created` event
#[derive(Debug)]
pub struct AuditLogHandler {
    storage: Arc<dyn Storage<AuditRecord>>,
}

impl AuditLogHandler {
    pub fn new(storage: Arc<dyn Storage<AuditRecord>>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl EventHandler for AuditLogHandler {
    fn name(&self) -> &'static str {
        "audit_log"
    }

    fn handles(&self, event_type: EventType) -> bool {
        event_type == EventType::WorkflowCreated
    }

    async fn handle(&self, event: &DomainEvent) -> Result<(), DomainError> {
        match self.storage.create(AuditRecord::from_event(event)).await {
            Ok(_) => {
                info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    partition_key = %event.partition_key,
                    "Audit record written"
                );
                Ok(())
            }
            Err(DomainError::Conflict { .. }) => {
                debug!(event_id = %event.id, "Audit record already present");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
