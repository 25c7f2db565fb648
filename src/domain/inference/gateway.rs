use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::message::{Message, TokenUsage};
use super::routing::ProviderRoute;
use super::sensitivity::SensitivityHint;
use crate::domain::DomainError;

/// Result of a routed completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayCompletion {
    pub text: String,
    pub model_id: String,
    pub route: ProviderRoute,
    pub usage: TokenUsage,
}

/// Single entry point for every inference call
///
/// Implementations pick the provider from the hint, retry and fail over,
/// and return `InferenceUnavailable` once every allowed attempt failed.
#[async_trait]
pub trait InferenceGateway: Send + Sync + Debug {
    async fn complete(
        &self,
        messages: Vec<Message>,
        system_prompt: &str,
        temperature: f32,
        hint: SensitivityHint,
    ) -> Result<GatewayCompletion, DomainError>;
}
