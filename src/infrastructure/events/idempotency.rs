//! Per-handler deduplication of stream deliveries

use std::sync::Arc;

use moka::future::Cache;

use crate::domain::event::{EventId, ProcessedEvent};
use crate::domain::storage::{Storage, StorageKey};
use crate::domain::DomainError;

/// Remembers which `{handler}:{event_id}` pairs already succeeded
///
/// Storage is the source of truth; the moka cache only spares the lookup
/// for recently seen deliveries.
#[derive(Debug)]
pub struct IdempotencyGuard {
    storage: Arc<dyn Storage<ProcessedEvent>>,
    cache: Cache<String, ()>,
}

impl IdempotencyGuard {
    pub fn new(storage: Arc<dyn Storage<ProcessedEvent>>, capacity: u64) -> Self {
        let cache = Cache::builder().max_capacity(capacity.max(1)).build();

        Self { storage, cache }
    }

    pub async fn is_processed(
        &self,
        handler: &str,
        event_id: &EventId,
    ) -> Result<bool, DomainError> {
        let key = ProcessedEvent::key_for(handler, event_id);

        if self.cache.get(key.as_str()).await.is_some() {
            return Ok(true);
        }

        let processed = self.storage.exists(&key).await?;

        if processed {
            self.cache.insert(key.as_str().to_string(), ()).await;
        }

        Ok(processed)
    }

    /// Records a success; a concurrent duplicate record is not an error
    pub async fn mark_processed(
        &self,
        handler: &str,
        event_id: &EventId,
    ) -> Result<(), DomainError> {
        let record = ProcessedEvent::new(handler, event_id);
        let key = record.key.as_str().to_string();

        match self.storage.create(record).await {
            Ok(_) | Err(DomainError::Conflict { .. }) => {
                self.cache.insert(key, ()).await;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
