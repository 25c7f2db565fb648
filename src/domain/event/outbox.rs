//! Durable outbox records

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::entity::{DomainEvent, EventId};
use crate::domain::storage::StorageEntity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    Pending,
    Published,
    DeadLettered,
}

/// An event waiting to reach the stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxRecord {
    pub id: EventId,
    pub event: DomainEvent,
    pub status: OutboxStatus,
    pub attempts: u32,
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Stream entry id once published
    pub stream_entry_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OutboxRecord {
    pub fn pending(event: DomainEvent) -> Self {
        let now = Utc::now();

        Self {
            id: event.id.clone(),
            event,
            status: OutboxStatus::Pending,
            attempts: 0,
            next_attempt_at: Some(now),
            last_error: None,
            stream_entry_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn mark_published(&mut self, entry_id: impl Into<String>) {
        let now = Utc::now();

        self.attempts += 1;
        self.status = OutboxStatus::Published;
        self.stream_entry_id = Some(entry_id.into());
        self.next_attempt_at = None;
        self.last_error = None;
        self.updated_at = now;
    }

    /// Records a failed append, dead-lettering after `max_attempts`
    ///
    /// Backoff is `retry_delay * 2^(attempts-1)`.
    pub fn record_failure(
        &mut self,
        error: impl Into<String>,
        retry_delay: std::time::Duration,
        max_attempts: u32,
    ) {
        let now = Utc::now();

        self.attempts += 1;
        self.last_error = Some(error.into());
        self.updated_at = now;

        if self.attempts >= max_attempts {
            self.status = OutboxStatus::DeadLettered;
            self.next_attempt_at = None;
        } else {
            let factor = 2u32.saturating_pow(self.attempts.saturating_sub(1));
            let backoff = retry_delay.saturating_mul(factor);
            let backoff = Duration::from_std(backoff).unwrap_or_else(|_| Duration::hours(1));

            self.next_attempt_at = Some(now + backoff);
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == OutboxStatus::Pending
            && self.next_attempt_at.map(|at| at <= now).unwrap_or(true)
    }
}

impl StorageEntity for OutboxRecord {
    type Key = EventId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::EventType;
    use std::time::Duration as StdDuration;

    fn record() -> OutboxRecord {
        OutboxRecord::pending(DomainEvent::new(
            EventType::WorkflowCreated,
            "conv-1",
            serde_json::json!({}),
        ))
    }

    #[test]
    fn test_pending_is_due_immediately() {
        let record = record();
        assert_eq!(record.id, record.event.id);
        assert!(record.is_due(Utc::now()));
    }

    #[test]
    fn test_failure_backoff_grows() {
        let mut record = record();
        let delay = StdDuration::from_secs(10);

        record.record_failure("boom", delay, 5);
        let first = record.next_attempt_at.unwrap() - record.updated_at;
        record.record_failure("boom", delay, 5);
        let second = record.next_attempt_at.unwrap() - record.updated_at;

        assert_eq!(first, Duration::seconds(10));
        assert_eq!(second, Duration::seconds(20));
        assert_eq!(record.status, OutboxStatus::Pending);
        assert!(!record.is_due(Utc::now()));
    }

    #[test]
    fn test_dead_letter_after_max_attempts() {
        let mut record = record();

        record.record_failure("boom", StdDuration::from_secs(1), 2);
        record.record_failure("still down", StdDuration::from_secs(1), 2);

        assert_eq!(record.status, OutboxStatus::DeadLettered);
        assert_eq!(record.last_error.as_deref(), Some("still down"));
        assert!(!record.is_due(Utc::now()));
    }

    #[test]
    fn test_mark_published() {
        let mut record = record();
        record.mark_published("1-0");

        assert_eq!(record.status, OutboxStatus::Published);
        assert_eq!(record.stream_entry_id.as_deref(), Some("1-0"));
        assert_eq!(record.attempts, 1);
    }
}
