use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::entity::DomainEvent;
use crate::domain::DomainError;

/// An event as stored in the stream, with its position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEntry {
    /// Monotonic position, e.g. `1718000000000-0`
    pub entry_id: String,
    pub event: DomainEvent,
}

/// Ordered, append-only event log
///
/// A single log preserves the relative order of events sharing a
/// partition key; safe for concurrent producers.
#[async_trait]
pub trait EventStream: Send + Sync + Debug {
    /// Appends an event and returns its entry id
    async fn append(&self, event: &DomainEvent) -> Result<String, DomainError>;

    /// Reads up to `limit` entries strictly after `cursor`, from the start when `None`
    async fn read_after(
        &self,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<Vec<StreamEntry>, DomainError>;

    /// Backend name for logs and readiness
    fn name(&self) -> &'static str;
}
