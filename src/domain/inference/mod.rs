//! Inference domain: provider capability, privacy routing and the gateway seam

mod gateway;
mod message;
mod provider;
mod routing;
mod sensitivity;

pub use gateway::{GatewayCompletion, InferenceGateway};
pub use message::{Message, MessageRole, TokenUsage};
pub use provider::{Completion, CompletionRequest, InferenceProvider};
pub use routing::{select_route, PrivacyPolicy, ProviderRoute, RouteDecision, RouteReason};
pub use sensitivity::{SensitiveDataClassifier, SensitivityHint};

#[cfg(test)]
pub use gateway::mock as gateway_mock;
#[cfg(test)]
pub use provider::mock as provider_mock;
