//! Outbox-backed publisher

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::config::EventsConfig;
use crate::domain::event::{DomainEvent, EventId, EventStream, OutboxRecord, OutboxStatus};
use crate::domain::storage::Storage;
use crate::domain::workflow::WorkflowDefinition;
use crate::domain::DomainError;
use crate::infrastructure::observability::{record_outbox_dead_letter, record_outbox_publish};

/// Counts of one sweep pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub published: usize,
    pub retried_later: usize,
    pub dead_lettered: usize,
    pub purged: usize,
}

/// Records events in the outbox, then appends them to the stream
///
/// An event is persisted as `pending` before its first append attempt, so
/// a stream outage only delays delivery. Events sharing a partition key
/// are appended in creation order: once one of them is left pending, later
/// ones wait for the sweeper.
#[derive(Debug)]
pub struct EventDispatcher {
    outbox: Arc<dyn Storage<OutboxRecord>>,
    stream: Arc<dyn EventStream>,
    retry_delay: Duration,
    max_attempts: u32,
    retention: Duration,
}

impl EventDispatcher {
    pub fn new(
        outbox: Arc<dyn Storage<OutboxRecord>>,
        stream: Arc<dyn EventStream>,
        config: &EventsConfig,
    ) -> Self {
        Self {
            outbox,
            stream,
            retry_delay: config.outbox_retry_delay(),
            max_attempts: config.outbox_max_attempts.max(1),
            retention: config.published_retention(),
        }
    }

    pub fn stream_name(&self) -> &'static str {
        self.stream.name()
    }

    /// Emits `workflow_created` then `workflow_trigger_requested`
    ///
    /// Fails only when the outbox itself cannot be written.
    pub async fn publish_activation(
        &self,
        definition: &WorkflowDefinition,
    ) -> Result<Vec<EventId>, DomainError> {
        let events = [
            DomainEvent::workflow_created(definition)?,
            DomainEvent::workflow_trigger_requested(definition)?,
        ];

        let mut ids = Vec::with_capacity(events.len());
        let mut blocked = false;

        for event in events {
            ids.push(event.id.clone());
            let record = self.enqueue(event).await?;

            if !blocked {
                blocked = self.try_append(record).await.status == OutboxStatus::Pending;
            }
        }

        Ok(ids)
    }

    /// Records and attempts a single event
    pub async fn publish(&self, event: DomainEvent) -> Result<EventId, DomainError> {
        let id = event.id.clone();
        let record = self.enqueue(event).await?;
        self.try_append(record).await;
        Ok(id)
    }

    async fn enqueue(&self, event: DomainEvent) -> Result<OutboxRecord, DomainError> {
        let record = OutboxRecord::pending(event);
        self.outbox.create(record.clone()).await?;
        Ok(record)
    }

    async fn try_append(&self, mut record: OutboxRecord) -> OutboxRecord {
        let event_type = record.event.event_type.as_str();

        match self.stream.append(&record.event).await {
            Ok(entry_id) => {
                record_outbox_publish(event_type, true);
                debug!(
                    event_id = %record.id,
                    event_type,
                    entry_id = %entry_id,
                    stream = self.stream.name(),
                    "Event published"
                );
                record.mark_published(entry_id);
            }
            Err(e) => {
                record_outbox_publish(event_type, false);
                record.record_failure(e.to_string(), self.retry_delay, self.max_attempts);

                if record.status == OutboxStatus::DeadLettered {
                    record_outbox_dead_letter(event_type);
                    error!(
                        event_id = %record.id,
                        event_type,
                        attempts = record.attempts,
                        error = %e,
                        "DEAD LETTER: outbox event exceeded max attempts"
                    );
                } else {
                    warn!(
                        event_id = %record.id,
                        event_type,
                        attempts = record.attempts,
                        next_attempt_at = ?record.next_attempt_at,
                        error = %e,
                        "Event publish failed, will retry"
                    );
                }
            }
        }

        if let Err(e) = self.outbox.save(record.clone()).await {
            error!(event_id = %record.id, error = %e, "Failed to update outbox record");
        }

        record
    }

    /// Republishes due records and purges old published ones
    pub async fn sweep(&self) -> Result<SweepReport, DomainError> {
        let now = Utc::now();
        let mut records = self.outbox.list().await?;
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.event.event_type.as_str().cmp(b.event.event_type.as_str()))
        });

        let mut report = SweepReport::default();
        let mut blocked: HashSet<String> = HashSet::new();

        for record in records {
            match record.status {
                OutboxStatus::Pending => {
                    let partition = record.event.partition_key.clone();

                    if blocked.contains(&partition) || !record.is_due(now) {
                        blocked.insert(partition);
                        continue;
                    }

                    match self.try_append(record).await.status {
                        OutboxStatus::Published => report.published += 1,
                        OutboxStatus::DeadLettered => report.dead_lettered += 1,
                        OutboxStatus::Pending => {
                            report.retried_later += 1;
                            blocked.insert(partition);
                        }
                    }
                }
                OutboxStatus::Published => {
                    let expired = chrono::Duration::from_std(self.retention)
                        .map(|retention| record.updated_at + retention < now)
                        .unwrap_or(false);

                    if expired && self.outbox.delete(&record.id).await? {
                        report.purged += 1;
                    }
                }
                OutboxStatus::DeadLettered => {}
            }
        }

        if report != SweepReport::default() {
            info!(
                published = report.published,
                retried_later = report.retried_later,
                dead_lettered = report.dead_lettered,
                purged = report.purged,
                "Outbox sweep finished"
            );
        }

        Ok(report)
    }
}
