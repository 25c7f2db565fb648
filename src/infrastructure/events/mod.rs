//! Event streams, outbox dispatch and consumers

mod config;
mod dispatcher;
pub mod handlers;
mod idempotency;
mod in_memory_stream;
mod redis_stream;
mod sweeper;
mod worker;

use std::sync::Arc;

use crate::domain::event::EventStream;
use crate::domain::DomainError;

pub use config::{EventsConfig, StreamBackendType};
pub use dispatcher::{EventDispatcher, SweepReport};
pub use handlers::{AuditLogHandler, ExecutionTriggerHandler, NotificationHandler, NotificationsConfig};
pub use idempotency::IdempotencyGuard;
pub use in_memory_stream::InMemoryEventStream;
pub use redis_stream::RedisEventStream;
pub use sweeper::OutboxSweeper;
pub use worker::EventWorker;

/// Opens the configured stream backend
pub async fn create_event_stream(
    config: &EventsConfig,
) -> Result<Arc<dyn EventStream>, DomainError> {
    match config.stream {
        StreamBackendType::Memory => Ok(Arc::new(InMemoryEventStream::new())),
        StreamBackendType::Redis => Ok(Arc::new(
            RedisEventStream::connect(&config.redis_url, &config.stream_key, config.stream_max_len)
                .await?,
        )),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::BTreeMap;

    use serde_json::json;

    use crate::domain::conversation::ConversationId;
    use crate::domain::workflow::{
        MaterializeContext, MaterializerConfig, WorkflowDefinition, WorkflowMaterializer,
    };
    use crate::infrastructure::catalog::default_templates;

    /// A payment tracker definition built from the built-in catalog
    pub fn definition() -> WorkflowDefinition {
        let template = default_templates()
            .into_iter()
            .find(|t| t.id == "finance-payment-tracker")
            .unwrap();
        let findings = BTreeMap::from([("account_number".to_string(), json!("0012345678"))]);
        let context = MaterializeContext::new(ConversationId::new("conv-1").unwrap())
            .with_model_ids(vec!["claude-sonnet-4-20250514".to_string()]);

        WorkflowMaterializer::new(MaterializerConfig::default())
            .materialize(&template, &findings, &context)
            .unwrap()
    }
}
