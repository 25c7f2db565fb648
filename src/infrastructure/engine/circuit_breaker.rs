//! Consecutive-failure circuit breaker

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use tracing::warn;

use crate::infrastructure::observability::record_circuit_state;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    fn gauge(self) -> u8 {
        match self {
            Self::Closed => 0,
            Self::HalfOpen => 1,
            Self::Open => 2,
        }
    }
}

/// Opens after `threshold` consecutive failures, half-opens after `reset`
///
/// A half-open breaker lets calls through; the first failure re-opens it
/// and the first success closes it.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: &'static str,
    failure_count: AtomicU32,
    last_failure_ms: AtomicU64,
    threshold: u32,
    reset_ms: u64,
}

impl CircuitBreaker {
    pub fn new(name: &'static str, threshold: u32, reset: Duration) -> Self {
        Self {
            name,
            failure_count: AtomicU32::new(0),
            last_failure_ms: AtomicU64::new(0),
            threshold: threshold.max(1),
            reset_ms: reset.as_millis() as u64,
        }
    }

    pub fn state(&self) -> CircuitState {
        if self.failure_count.load(Ordering::Relaxed) < self.threshold {
            return CircuitState::Closed;
        }

        let elapsed = now_ms().saturating_sub(self.last_failure_ms.load(Ordering::Relaxed));

        if elapsed >= self.reset_ms {
            CircuitState::HalfOpen
        } else {
            CircuitState::Open
        }
    }

    pub fn is_available(&self) -> bool {
        self.state() != CircuitState::Open
    }

    pub fn record_success(&self) {
        self.failure_count.store(0, Ordering::Relaxed);
        record_circuit_state(self.name, CircuitState::Closed.gauge());
    }

    pub fn record_failure(&self) {
        let failures = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
        self.last_failure_ms.store(now_ms(), Ordering::Relaxed);

        if failures == self.threshold {
            warn!(breaker = self.name, failures, "Circuit breaker opened");
        }

        record_circuit_state(self.name, self.state().gauge());
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opens_after_threshold() {
        let breaker = CircuitBreaker::new("test", 3, Duration::from_secs(60));

        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.is_available());
    }

    #[test]
    fn test_success_closes() {
        let breaker = CircuitBreaker::new("test", 1, Duration::from_secs(60));

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_after_reset() {
        let breaker = CircuitBreaker::new("test", 1, Duration::ZERO);

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(breaker.is_available());
    }
}
