//! Stream consumer dispatching entries to handlers

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::config::EventsConfig;
use super::idempotency::IdempotencyGuard;
use crate::domain::event::{ConsumerCursor, EventHandler, EventStream, StreamEntry};
use crate::domain::storage::{RecordKey, Storage};
use crate::domain::DomainError;
use crate::infrastructure::observability::record_event_handled;

/// Polls the stream from a persisted cursor
///
/// Delivery is at-least-once: the cursor is saved after a batch, so a crash
/// replays the batch and the idempotency guard filters handlers that
/// already succeeded.
#[derive(Debug)]
pub struct EventWorker {
    consumer: String,
    stream: Arc<dyn EventStream>,
    cursors: Arc<dyn Storage<ConsumerCursor>>,
    guard: Arc<IdempotencyGuard>,
    handlers: Vec<Arc<dyn EventHandler>>,
    poll_interval: Duration,
    batch_size: usize,
    max_attempts: u32,
    retry_delay: Duration,
}

impl EventWorker {
    pub fn new(
        consumer: impl Into<String>,
        stream: Arc<dyn EventStream>,
        cursors: Arc<dyn Storage<ConsumerCursor>>,
        guard: Arc<IdempotencyGuard>,
        config: &EventsConfig,
    ) -> Self {
        Self {
            consumer: consumer.into(),
            stream,
            cursors,
            guard,
            handlers: Vec::new(),
            poll_interval: config.worker_poll_interval(),
            batch_size: config.worker_batch_size.max(1),
            max_attempts: config.worker_max_attempts.max(1),
            retry_delay: config.worker_retry_delay(),
        }
    }

    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn consumer(&self) -> &str {
        &self.consumer
    }

    async fn load_cursor(&self) -> Result<ConsumerCursor, DomainError> {
        Ok(self
            .cursors
            .get(&RecordKey::new(self.consumer.as_str()))
            .await?
            .unwrap_or_else(|| ConsumerCursor::new(self.consumer.as_str())))
    }

    /// Handles one batch, returning the number of entries consumed
    pub async fn poll_once(&self) -> Result<usize, DomainError> {
        let mut cursor = self.load_cursor().await?;
        let entries = self
            .stream
            .read_after(cursor.last_entry_id.as_deref(), self.batch_size)
            .await?;

        if entries.is_empty() {
            return Ok(0);
        }

        for entry in &entries {
            self.process_entry(entry).await;
            cursor.advance(entry.entry_id.as_str());
        }

        self.cursors.save(cursor).await?;

        debug!(
            consumer = %self.consumer,
            count = entries.len(),
            "Consumed stream entries"
        );

        Ok(entries.len())
    }

    async fn process_entry(&self, entry: &StreamEntry) {
        let event = &entry.event;

        for handler in self
            .handlers
            .iter()
            .filter(|h| h.handles(event.event_type))
        {
            let mut attempt = 0;

            loop {
                attempt += 1;

                match self.deliver(handler.as_ref(), entry).await {
                    Ok(()) => break,
                    Err(e) if attempt < self.max_attempts => {
                        let backoff = self
                            .retry_delay
                            .saturating_mul(2u32.saturating_pow(attempt - 1));

                        warn!(
                            consumer = %self.consumer,
                            handler = handler.name(),
                            event_id = %event.id,
                            attempt,
                            error = %e,
                            "Event handler failed, retrying"
                        );
                        record_event_handled(handler.name(), "failed");
                        tokio::time::sleep(backoff).await;
                    }
                    Err(e) => {
                        record_event_handled(handler.name(), "dead_lettered");
                        error!(
                            consumer = %self.consumer,
                            handler = handler.name(),
                            event_id = %event.id,
                            event_type = %event.event_type,
                            entry_id = %entry.entry_id,
                            attempts = attempt,
                            error = %e,
                            "DEAD LETTER: event skipped after max attempts"
                        );
                        break;
                    }
                }
            }
        }
    }

    async fn deliver(
        &self,
        handler: &dyn EventHandler,
        entry: &StreamEntry,
    ) -> Result<(), DomainError> {
        let event = &entry.event;

        if self.guard.is_processed(handler.name(), &event.id).await? {
            record_event_handled(handler.name(), "duplicate");
            debug!(
                handler = handler.name(),
                event_id = %event.id,
                "Event already processed, skipping"
            );
            return Ok(());
        }

        handler.handle(event).await?;
        self.guard.mark_processed(handler.name(), &event.id).await?;
        record_event_handled(handler.name(), "processed");

        Ok(())
    }

    /// Polls until the shutdown signal flips to `true`
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            consumer = %self.consumer,
            stream = self.stream.name(),
            handlers = self.handlers.len(),
            "Event worker started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let idle = match self.poll_once().await {
                Ok(count) => count == 0,
                Err(e) => {
                    error!(consumer = %self.consumer, error = %e, "Event worker poll failed");
                    true
                }
            };

            if idle {
                tokio::select! {
                    _ = tokio::time::sleep(self.poll_interval) => {}
                    _ = shutdown.changed() => {}
                }
            }
        }

        info!(consumer = %self.consumer, "Event worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::handler_mock::RecordingHandler;
    use crate::domain::event::stream_mock::MockEventStream;
    use crate::domain::event::{DomainEvent, EventType};
    use crate::domain::storage::mock::MockStorage;

    fn config() -> EventsConfig {
        EventsConfig {
            worker_max_attempts: 3,
            worker_retry_delay_ms: 1,
            worker_poll_interval_ms: 5,
            ..Default::default()
        }
    }

    async fn stream_with(events: &[EventType]) -> Arc<MockEventStream> {
        let stream = Arc::new(MockEventStream::new());
        for event_type in events {
            stream
                .append(&DomainEvent::new(*event_type, "conv-1", serde_json::json!({})))
                .await
                .unwrap();
        }
        stream
    }

    fn worker(
        stream: Arc<MockEventStream>,
        cursors: Arc<MockStorage<ConsumerCursor>>,
        guard: Arc<IdempotencyGuard>,
    ) -> EventWorker {
        EventWorker::new("test-consumer", stream, cursors, guard, &config())
    }

    fn guard() -> Arc<IdempotencyGuard> {
        Arc::new(IdempotencyGuard::new(Arc::new(MockStorage::new()), 100))
    }

    #[tokio::test]
    async fn test_dispatches_by_event_type() {
        let stream =
            stream_with(&[EventType::WorkflowCreated, EventType::WorkflowTriggerRequested]).await;
        let audit = Arc::new(RecordingHandler::new("audit", vec![EventType::WorkflowCreated]));
        let trigger = Arc::new(RecordingHandler::new(
            "trigger",
            vec![EventType::WorkflowTriggerRequested],
        ));
        let cursors = Arc::new(MockStorage::new());

        let worker = worker(stream, cursors.clone(), guard())
            .with_handler(audit.clone())
            .with_handler(trigger.clone());

        assert_eq!(worker.poll_once().await.unwrap(), 2);
        assert_eq!(worker.poll_once().await.unwrap(), 0);

        assert_eq!(audit.handled().len(), 1);
        assert_eq!(trigger.handled().len(), 1);
        assert_eq!(
            audit.handled()[0].event_type,
            EventType::WorkflowCreated
        );

        let cursor = cursors
            .get(&RecordKey::new("test-consumer"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cursor.last_entry_id.as_deref(), Some("2-0"));
    }

    #[tokio::test]
    async fn test_redelivery_is_deduplicated() {
        let stream = stream_with(&[EventType::WorkflowCreated]).await;
        let audit = Arc::new(RecordingHandler::new("audit", vec![EventType::WorkflowCreated]));
        let guard = guard();

        worker(stream.clone(), Arc::new(MockStorage::new()), guard.clone())
            .with_handler(audit.clone())
            .poll_once()
            .await
            .unwrap();

        // a consumer with a lost cursor replays from the start
        worker(stream, Arc::new(MockStorage::new()), guard)
            .with_handler(audit.clone())
            .poll_once()
            .await
            .unwrap();

        assert_eq!(audit.handled().len(), 1);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let stream = stream_with(&[EventType::WorkflowCreated]).await;
        let audit = Arc::new(
            RecordingHandler::new("audit", vec![EventType::WorkflowCreated]).failing(2),
        );

        worker(stream, Arc::new(MockStorage::new()), guard())
            .with_handler(audit.clone())
            .poll_once()
            .await
            .unwrap();

        assert_eq!(audit.handled().len(), 1);
    }

    #[tokio::test]
    async fn test_poison_entry_is_skipped_after_max_attempts() {
        let stream =
            stream_with(&[EventType::WorkflowCreated, EventType::WorkflowCreated]).await;
        let audit = Arc::new(
            RecordingHandler::new("audit", vec![EventType::WorkflowCreated]).failing(3),
        );
        let cursors = Arc::new(MockStorage::new());

        let worker = worker(stream.clone(), cursors.clone(), guard()).with_handler(audit.clone());

        assert_eq!(worker.poll_once().await.unwrap(), 2);

        let handled = audit.handled();
        assert_eq!(handled.len(), 1);
        assert_eq!(handled[0].id, stream.entries()[1].event.id);

        let cursor = cursors
            .get(&RecordKey::new("test-consumer"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cursor.last_entry_id.as_deref(), Some("2-0"));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let stream = stream_with(&[EventType::WorkflowCreated]).await;
        let audit = Arc::new(RecordingHandler::new("audit", vec![EventType::WorkflowCreated]));
        let worker =
            worker(stream, Arc::new(MockStorage::new()), guard()).with_handler(audit.clone());

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(worker.run(rx));

        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(audit.handled().len(), 1);
    }
}
