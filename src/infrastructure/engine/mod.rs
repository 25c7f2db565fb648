//! External execution engine adapter

mod circuit_breaker;
mod http_engine;
mod status;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use http_engine::{EngineConfig, HttpExecutionEngine};
pub use status::{EngineCallback, ExecutionStatusTracker};
