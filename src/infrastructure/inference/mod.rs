//! Inference gateway implementation

mod gateway;

pub use gateway::{GatewayConfig, RoutingInferenceGateway};
