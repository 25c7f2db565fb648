//! Domain events, the outbox and the stream seam

mod entity;
mod handler;
mod outbox;
mod records;
mod stream;

pub use entity::{
    DomainEvent, EventId, EventType, TriggerRequestedPayload, WorkflowCreatedPayload,
};
pub use handler::EventHandler;
pub use outbox::{OutboxRecord, OutboxStatus};
pub use records::{AuditRecord, ConsumerCursor, ProcessedEvent};
pub use stream::{EventStream, StreamEntry};

#[cfg(test)]
pub use handler::mock as handler_mock;
#[cfg(test)]
pub use stream::mock as stream_mock;
