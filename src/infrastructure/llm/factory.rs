use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use super::anthropic::{AnthropicProvider, DEFAULT_ANTHROPIC_BASE_URL};
use super::http_client::HttpClient;
use super::openai_compatible::{OpenAiCompatibleProvider, DEFAULT_LOCAL_BASE_URL};
use crate::domain::inference::InferenceProvider;
use crate::domain::DomainError;

/// Cloud provider settings (Anthropic Messages API)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CloudProviderConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for CloudProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_ANTHROPIC_BASE_URL.to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Local provider settings (OpenAI-compatible endpoint)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalProviderConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LocalProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LOCAL_BASE_URL.to_string(),
            model: "llama3.1:8b".to_string(),
            api_key: None,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug)]
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create_cloud(
        config: &CloudProviderConfig,
    ) -> Result<Arc<dyn InferenceProvider>, DomainError> {
        if config.api_key.trim().is_empty() {
            return Err(DomainError::configuration(
                "Cloud provider requires an API key",
            ));
        }

        let client =
            HttpClient::with_timeout("anthropic", Duration::from_secs(config.timeout_secs))?;
        let provider = AnthropicProvider::new(client, &config.api_key, &config.model)
            .with_base_url(&config.base_url);

        Ok(Arc::new(provider))
    }

    pub fn create_local(
        config: &LocalProviderConfig,
    ) -> Result<Arc<dyn InferenceProvider>, DomainError> {
        if config.base_url.trim().is_empty() {
            return Err(DomainError::configuration(
                "Local provider requires a base URL",
            ));
        }

        let client = HttpClient::with_timeout("local", Duration::from_secs(config.timeout_secs))?;
        let mut provider = OpenAiCompatibleProvider::new(client, &config.base_url, &config.model);

        if let Some(api_key) = &config.api_key {
            provider = provider.with_api_key(api_key);
        }

        Ok(Arc::new(provider))
    }
}
