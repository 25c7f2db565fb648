//! Tracing, metrics and log setup

mod config;
mod metrics;
mod tracing_setup;

pub use config::{MetricsConfig, ObservabilityConfig, TracingConfig};
pub use metrics::{
    create_metrics_router, init_metrics, record_activation, record_circuit_state,
    record_engine_call, record_event_handled, record_http_request, record_inference_attempt,
    record_inference_failover, record_inference_tokens, record_outbox_dead_letter,
    record_outbox_publish, record_turn, PrometheusMetrics,
};
pub use tracing_setup::{init_logging, init_tracing, shutdown_tracing};
