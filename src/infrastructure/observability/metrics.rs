//! Prometheus metrics

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use regex::Regex;

use super::config::MetricsConfig;

/// Path segment following these collections is an identifier
static ID_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/(conversations|templates|workflows)/[^/]+").unwrap()
});

/// Handle rendering the Prometheus exposition format
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    let builder = match PrometheusBuilder::new().set_buckets(&config.duration_buckets) {
        Ok(builder) => builder,
        Err(e) => {
            tracing::error!(error = %e, "Invalid histogram buckets, metrics disabled");
            return None;
        }
    };

    match builder.install_recorder() {
        Ok(handle) => {
            gauge!("orchestrator_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
            tracing::info!(path = %config.path, "Prometheus metrics initialized");

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize Prometheus metrics");
            None
        }
    }
}

pub fn create_metrics_router(metrics: PrometheusMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());

    if status >= 500 {
        counter!("http_server_errors_total", &labels).increment(1);
    }
}

/// One provider attempt made by the inference gateway
pub fn record_inference_attempt(route: &str, success: bool, duration: Duration) {
    let labels = [
        ("route", route.to_string()),
        ("status", if success { "success" } else { "error" }.to_string()),
    ];

    counter!("inference_requests_total", &labels).increment(1);
    histogram!("inference_request_duration_seconds", &labels).record(duration.as_secs_f64());
}

pub fn record_inference_tokens(route: &str, input_tokens: u32, output_tokens: u32) {
    let labels = [("route", route.to_string())];

    counter!("inference_input_tokens_total", &labels).increment(u64::from(input_tokens));
    counter!("inference_output_tokens_total", &labels).increment(u64::from(output_tokens));
}

/// Failover from one provider route to the other
pub fn record_inference_failover(from: &str, to: &str) {
    counter!("inference_failovers_total", "from" => from.to_string(), "to" => to.to_string())
        .increment(1);
}

/// A processed turn, labelled by the kind of response returned
pub fn record_turn(outcome: &str, duration: Duration) {
    let labels = [("outcome", outcome.to_string())];

    counter!("orchestrator_turns_total", &labels).increment(1);
    histogram!("orchestrator_turn_duration_seconds", &labels).record(duration.as_secs_f64());
}

pub fn record_activation(template_id: &str) {
    counter!("workflow_activations_total", "template" => template_id.to_string()).increment(1);
}

pub fn record_outbox_publish(event_type: &str, success: bool) {
    counter!(
        "events_published_total",
        "event_type" => event_type.to_string(),
        "status" => if success { "success" } else { "error" }
    )
    .increment(1);
}

pub fn record_outbox_dead_letter(event_type: &str) {
    counter!("outbox_dead_letters_total", "event_type" => event_type.to_string()).increment(1);
}

/// `status` is one of `processed`, `duplicate`, `failed` or `dead_lettered`
pub fn record_event_handled(handler: &str, status: &str) {
    counter!(
        "worker_events_total",
        "handler" => handler.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_engine_call(engine: &str, success: bool) {
    counter!(
        "engine_calls_total",
        "engine" => engine.to_string(),
        "status" => if success { "success" } else { "error" }
    )
    .increment(1);
}

/// 0 closed, 1 half-open, 2 open
pub fn record_circuit_state(name: &str, state: u8) {
    gauge!("circuit_breaker_state", "name" => name.to_string()).set(f64::from(state));
}

fn sanitize_path(path: &str) -> String {
    let path = ID_SEGMENT.replace_all(path, "/$1/{id}");

    if path.len() > 64 {
        path.chars().take(64).collect()
    } else {
        path.into_owned()
    }
}
