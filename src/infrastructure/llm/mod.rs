//! Inference provider adapters

mod anthropic;
mod factory;
mod http_client;
mod openai_compatible;

pub use anthropic::AnthropicProvider;
pub use factory::{CloudProviderConfig, LocalProviderConfig, ProviderFactory};
pub use http_client::{HttpClient, HttpClientTrait};
pub use openai_compatible::OpenAiCompatibleProvider;

#[cfg(test)]
pub use http_client::mock as http_mock;
