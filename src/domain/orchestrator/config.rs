use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables of the conversation state machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Minimum top-match confidence to delegate without clarification
    pub confidence_threshold: f64,
    /// Required lead of the top match over the runner-up
    pub confidence_margin: f64,
    /// Templates offered when asking the user to choose
    pub candidate_count: usize,
    /// Weight of the active-domain prior in matching
    pub category_prior_weight: f64,
    pub inference_retry_backoff_ms: u64,
    /// Upper bound for a single inference call
    pub turn_timeout_ms: u64,
    pub extraction_temperature: f32,
    pub conversational_temperature: f32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.6,
            confidence_margin: 0.15,
            candidate_count: 3,
            category_prior_weight: 0.2,
            inference_retry_backoff_ms: 250,
            turn_timeout_ms: 30_000,
            extraction_temperature: 0.0,
            conversational_temperature: 0.7,
        }
    }
}

impl OrchestratorConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.inference_retry_backoff_ms)
    }

    pub fn turn_timeout(&self) -> Duration {
        Duration::from_millis(self.turn_timeout_ms)
    }

    /// Whether `top` is confident enough over `runner_up` to delegate
    pub fn is_confident(&self, top: f64, runner_up: Option<f64>) -> bool {
        top >= self.confidence_threshold
            && top - runner_up.unwrap_or(0.0) >= self.confidence_margin
    }
}
