use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::domain::event::{DomainEvent, EventStream, StreamEntry};
use crate::domain::DomainError;

/// Single-process ordered log
///
/// Entry ids are `{sequence}-0`, starting at 1, mirroring the Redis id shape.
#[derive(Debug, Default)]
pub struct InMemoryEventStream {
    entries: RwLock<Vec<StreamEntry>>,
}

impl InMemoryEventStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn sequence_of(entry_id: &str) -> Result<usize, DomainError> {
    entry_id
        .split_once('-')
        .map_or(entry_id, |(seq, _)| seq)
        .parse()
        .map_err(|_| DomainError::validation(format!("Invalid stream entry id '{}'", entry_id)))
}

#[async_trait]
impl EventStream for InMemoryEventStream {
    async fn append(&self, event: &DomainEvent) -> Result<String, DomainError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let entry_id = format!("{}-0", entries.len() + 1);

        entries.push(StreamEntry {
            entry_id: entry_id.clone(),
            event: event.clone(),
        });

        Ok(entry_id)
    }

    async fn read_after(
        &self,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<Vec<StreamEntry>, DomainError> {
        let start = cursor.map(sequence_of).transpose()?.unwrap_or(0);
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);

        Ok(entries.iter().skip(start).take(limit).cloned().collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
