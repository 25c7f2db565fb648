use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamBackendType {
    Memory,
    Redis,
}

/// Stream, outbox and worker settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub stream: StreamBackendType,
    pub redis_url: String,
    pub stream_key: String,
    /// Approximate cap passed to `XADD MAXLEN ~`
    pub stream_max_len: usize,
    pub outbox_max_attempts: u32,
    pub outbox_retry_delay_ms: u64,
    pub sweep_interval_ms: u64,
    /// How long published outbox records are kept
    pub published_retention_secs: u64,
    pub worker_poll_interval_ms: u64,
    pub worker_batch_size: usize,
    pub worker_max_attempts: u32,
    pub worker_retry_delay_ms: u64,
    pub idempotency_cache_capacity: u64,
    /// Run the workers inside `serve`
    pub embedded_workers: bool,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            stream: StreamBackendType::Memory,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            stream_key: "platform_events".to_string(),
            stream_max_len: 100_000,
            outbox_max_attempts: 8,
            outbox_retry_delay_ms: 1_000,
            sweep_interval_ms: 5_000,
            published_retention_secs: 86_400,
            worker_poll_interval_ms: 500,
            worker_batch_size: 100,
            worker_max_attempts: 5,
            worker_retry_delay_ms: 500,
            idempotency_cache_capacity: 10_000,
            embedded_workers: true,
        }
    }
}

impl EventsConfig {
    pub fn outbox_retry_delay(&self) -> Duration {
        Duration::from_millis(self.outbox_retry_delay_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn published_retention(&self) -> Duration {
        Duration::from_secs(self.published_retention_secs)
    }

    pub fn worker_poll_interval(&self) -> Duration {
        Duration::from_millis(self.worker_poll_interval_ms)
    }

    pub fn worker_retry_delay(&self) -> Duration {
        Duration::from_millis(self.worker_retry_delay_ms)
    }
}
