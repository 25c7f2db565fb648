use std::fmt::Debug;

use async_trait::async_trait;

use super::entity::{DomainEvent, EventType};
use crate::domain::DomainError;

/// Consumer of stream events
///
/// Delivery is at-least-once, so handlers must tolerate re-delivery of
/// the same event id.
#[async_trait]
pub trait EventHandler: Send + Sync + Debug {
    /// Stable name, part of the idempotency key
    fn name(&self) -> &'static str;

    fn handles(&self, event_type: EventType) -> bool;

    async fn handle(&self, event: &DomainEvent) -> Result<(), DomainError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Records every handled event, optionally failing the first calls
    #[derive(Debug)]
    pub struct RecordingHandler {
        name: &'static str,
        accepts: Vec<EventType>,
        handled: Mutex<Vec<DomainEvent>>,
        failures: Mutex<u32>,
    }

    impl RecordingHandler {
        pub fn new(name: &'static str, accepts: Vec<EventType>) -> Self {
            Self {
                name,
                accepts,
                handled: Mutex::new(Vec::new()),
                failures: Mutex::new(0),
            }
        }

        pub fn failing(self, count: u32) -> Self {
            *self.failures.lock().unwrap() = count;
            self
        }

        pub fn handled(&self) -> Vec<DomainEvent> {
            self.handled.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EventHandler for RecordingHandler {
        fn name(&self) -> &'static str {
            self.name
        }

        fn handles(&self, event_type: EventType) -> bool {
            self.accepts.contains(&event_type)
        }

        async fn handle(&self, event: &DomainEvent) -> Result<(), DomainError> {
            {
                let mut failures = self.failures.lock().unwrap();
                if *failures > 0 {
                    *failures -= 1;
                    return Err(DomainError::internal("Simulated handler failure"));
                }
            }

            self.handled.lock().unwrap().push(event.clone());
            Ok(())
        }
    }
}
