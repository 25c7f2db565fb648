use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::domain::inference::{
    select_route, Completion, CompletionRequest, GatewayCompletion, InferenceGateway,
    InferenceProvider, Message, PrivacyPolicy, ProviderRoute, SensitivityHint,
};
use crate::domain::DomainError;
use crate::infrastructure::observability::{
    record_inference_attempt, record_inference_failover, record_inference_tokens,
};

/// Retry and privacy settings of the gateway
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Pause before the same-provider retry
    pub retry_backoff_ms: u64,
    pub max_tokens: u32,
    #[serde(flatten)]
    pub privacy: PrivacyPolicy,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            retry_backoff_ms: 500,
            max_tokens: 1024,
            privacy: PrivacyPolicy::default(),
        }
    }
}

/// Gateway routing between a cloud and a local provider
///
/// Each request goes to the route picked by [`select_route`]. A failed
/// attempt is retried once on the same provider, then failed over once to
/// the other provider when the decision allows it.
pub struct RoutingInferenceGateway {
    providers: HashMap<ProviderRoute, Arc<dyn InferenceProvider>>,
    config: GatewayConfig,
}

impl fmt::Debug for RoutingInferenceGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut routes: Vec<_> = self.providers.keys().map(ProviderRoute::as_str).collect();
        routes.sort_unstable();

        f.debug_struct("RoutingInferenceGateway")
            .field("routes", &routes)
            .field("config", &self.config)
            .finish()
    }
}

impl RoutingInferenceGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            providers: HashMap::new(),
            config,
        }
    }

    pub fn with_provider(
        mut self,
        route: ProviderRoute,
        provider: Arc<dyn InferenceProvider>,
    ) -> Self {
        self.providers.insert(route, provider);
        self
    }

    pub fn has_route(&self, route: ProviderRoute) -> bool {
        self.providers.contains_key(&route)
    }

    async fn attempt(
        &self,
        route: ProviderRoute,
        provider: &dyn InferenceProvider,
        request: &CompletionRequest,
    ) -> Result<Completion, DomainError> {
        let started = Instant::now();
        let result = provider.complete(request).await;

        record_inference_attempt(route.as_str(), result.is_ok(), started.elapsed());

        match &result {
            Ok(completion) => record_inference_tokens(
                route.as_str(),
                completion.usage.input_tokens,
                completion.usage.output_tokens,
            ),
            Err(e) => warn!(
                route = %route,
                provider = provider.provider_name(),
                model = provider.model_id(),
                error = %e,
                "Inference attempt failed"
            ),
        }

        result
    }

    /// First attempt plus one retry after the backoff
    async fn attempt_with_retry(
        &self,
        route: ProviderRoute,
        provider: &dyn InferenceProvider,
        request: &CompletionRequest,
    ) -> Result<Completion, DomainError> {
        match self.attempt(route, provider, request).await {
            Ok(completion) => Ok(completion),
            Err(_) => {
                tokio::time::sleep(Duration::from_millis(self.config.retry_backoff_ms)).await;
                self.attempt(route, provider, request).await
            }
        }
    }

    fn finish(route: ProviderRoute, completion: Completion) -> GatewayCompletion {
        GatewayCompletion {
            text: completion.text,
            model_id: completion.model_id,
            route,
            usage: completion.usage,
        }
    }
}

#[async_trait]
impl InferenceGateway for RoutingInferenceGateway {
    async fn complete(
        &self,
        messages: Vec<Message>,
        system_prompt: &str,
        temperature: f32,
        hint: SensitivityHint,
    ) -> Result<GatewayCompletion, DomainError> {
        let decision = select_route(hint, &self.config.privacy);
        let request = CompletionRequest::new(system_prompt, messages)
            .with_temperature(temperature)
            .with_max_tokens(self.config.max_tokens);

        debug!(route = %decision.route, reason = ?decision.reason, "Routing inference request");

        let primary_error = match self.providers.get(&decision.route) {
            Some(provider) => {
                match self
                    .attempt_with_retry(decision.route, provider.as_ref(), &request)
                    .await
                {
                    Ok(completion) => return Ok(Self::finish(decision.route, completion)),
                    Err(e) => e.to_string(),
                }
            }
            None => format!("no {} provider configured", decision.route),
        };

        let Some(fallback) = decision.failover(&self.config.privacy) else {
            error!(
                route = %decision.route,
                error = %primary_error,
                "Inference failed and failover is not permitted for this request"
            );
            return Err(DomainError::inference_unavailable(primary_error));
        };

        let Some(provider) = self.providers.get(&fallback) else {
            error!(route = %decision.route, error = %primary_error, "Inference failed with no failover provider");
            return Err(DomainError::inference_unavailable(primary_error));
        };

        record_inference_failover(decision.route.as_str(), fallback.as_str());
        info!(from = %decision.route, to = %fallback, "Failing over inference request");

        match self.attempt(fallback, provider.as_ref(), &request).await {
            Ok(completion) => Ok(Self::finish(fallback, completion)),
            Err(e) => {
                error!(
                    primary_error = %primary_error,
                    failover_error = %e,
                    "Inference failed on every provider"
                );
                Err(DomainError::inference_unavailable(format!(
                    "{}; failover: {}",
                    primary_error, e
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::inference::provider_mock::MockInferenceProvider;

    fn config() -> GatewayConfig {
        GatewayConfig {
            retry_backoff_ms: 1,
            ..Default::default()
        }
    }

    fn gateway(
        config: GatewayConfig,
        cloud: Arc<MockInferenceProvider>,
        local: Arc<MockInferenceProvider>,
    ) -> RoutingInferenceGateway {
        RoutingInferenceGateway::new(config)
            .with_provider(ProviderRoute::Cloud, cloud)
            .with_provider(ProviderRoute::Local, local)
    }

    fn messages() -> Vec<Message> {
        vec![Message::user("automate my invoices")]
    }

    #[tokio::test]
    async fn test_normal_request_goes_to_cloud() {
        let cloud = Arc::new(MockInferenceProvider::new("anthropic", "claude").with_fallback("hi"));
        let local = Arc::new(MockInferenceProvider::new("local", "llama").with_fallback("hi"));
        let gateway = gateway(config(), cloud.clone(), local.clone());

        let completion = gateway
            .complete(messages(), "system", 0.3, SensitivityHint::Normal)
            .await
            .unwrap();

        assert_eq!(completion.route, ProviderRoute::Cloud);
        assert_eq!(completion.model_id, "claude");
        assert_eq!(cloud.calls(), 1);
        assert_eq!(local.calls(), 0);

        let request = &cloud.requests()[0];
        assert_eq!(request.system, "system");
        assert_eq!(request.temperature, 0.3);
        assert_eq!(request.max_tokens, 1024);
    }

    #[tokio::test]
    async fn test_sensitive_request_goes_local() {
        let cloud = Arc::new(MockInferenceProvider::new("anthropic", "claude").with_fallback("hi"));
        let local = Arc::new(MockInferenceProvider::new("local", "llama").with_fallback("hi"));
        let gateway = gateway(config(), cloud.clone(), local.clone());

        let completion = gateway
            .complete(messages(), "system", 0.0, SensitivityHint::Sensitive)
            .await
            .unwrap();

        assert_eq!(completion.route, ProviderRoute::Local);
        assert_eq!(cloud.calls(), 0);
    }

    #[tokio::test]
    async fn test_force_local_policy() {
        let mut config = config();
        config.privacy.force_local = true;

        let cloud = Arc::new(MockInferenceProvider::new("anthropic", "claude").with_fallback("hi"));
        let local = Arc::new(MockInferenceProvider::new("local", "llama").with_fallback("hi"));
        let gateway = gateway(config, cloud.clone(), local.clone());

        let completion = gateway
            .complete(messages(), "system", 0.0, SensitivityHint::Normal)
            .await
            .unwrap();

        assert_eq!(completion.route, ProviderRoute::Local);
        assert_eq!(cloud.calls(), 0);
    }

    #[tokio::test]
    async fn test_retry_on_same_provider() {
        let cloud = Arc::new(
            MockInferenceProvider::new("anthropic", "claude")
                .with_failure("HTTP 529")
                .with_response("recovered"),
        );
        let local = Arc::new(MockInferenceProvider::new("local", "llama").with_fallback("hi"));
        let gateway = gateway(config(), cloud.clone(), local.clone());

        let completion = gateway
            .complete(messages(), "system", 0.0, SensitivityHint::Normal)
            .await
            .unwrap();

        assert_eq!(completion.text, "recovered");
        assert_eq!(cloud.calls(), 2);
        assert_eq!(local.calls(), 0);
    }

    #[tokio::test]
    async fn test_failover_to_local_after_retry() {
        let cloud = Arc::new(MockInferenceProvider::new("anthropic", "claude").with_error("down"));
        let local = Arc::new(MockInferenceProvider::new("local", "llama").with_fallback("local reply"));
        let gateway = gateway(config(), cloud.clone(), local.clone());

        let completion = gateway
            .complete(messages(), "system", 0.0, SensitivityHint::Normal)
            .await
            .unwrap();

        assert_eq!(completion.route, ProviderRoute::Local);
        assert_eq!(completion.text, "local reply");
        assert_eq!(cloud.calls(), 2);
        assert_eq!(local.calls(), 1);
    }

    #[tokio::test]
    async fn test_sensitive_failover_blocked_when_configured() {
        let mut config = config();
        config.privacy.block_sensitive_failover = true;

        let cloud = Arc::new(MockInferenceProvider::new("anthropic", "claude").with_fallback("hi"));
        let local = Arc::new(MockInferenceProvider::new("local", "llama").with_error("down"));
        let gateway = gateway(config, cloud.clone(), local.clone());

        let result = gateway
            .complete(messages(), "system", 0.0, SensitivityHint::Sensitive)
            .await;

        assert!(matches!(result, Err(DomainError::InferenceUnavailable { .. })));
        assert_eq!(local.calls(), 2);
        assert_eq!(cloud.calls(), 0);
    }

    #[tokio::test]
    async fn test_sensitive_request_fails_over_to_cloud_by_default() {
        let cloud = Arc::new(MockInferenceProvider::new("anthropic", "claude").with_fallback("cloud"));
        let local = Arc::new(MockInferenceProvider::new("local", "llama").with_error("down"));
        let gateway = gateway(config(), cloud.clone(), local.clone());

        let completion = gateway
            .complete(messages(), "system", 0.0, SensitivityHint::Sensitive)
            .await
            .unwrap();

        assert_eq!(completion.route, ProviderRoute::Cloud);
        assert_eq!(completion.text, "cloud");
        assert_eq!(local.calls(), 2);
        assert_eq!(cloud.calls(), 1);
    }

    #[tokio::test]
    async fn test_both_providers_failing() {
        let cloud = Arc::new(MockInferenceProvider::new("anthropic", "claude").with_error("down"));
        let local = Arc::new(MockInferenceProvider::new("local", "llama").with_error("down"));
        let gateway = gateway(config(), cloud.clone(), local.clone());

        let result = gateway
            .complete(messages(), "system", 0.0, SensitivityHint::Normal)
            .await;

        assert!(matches!(result, Err(DomainError::InferenceUnavailable { .. })));
        assert_eq!(cloud.calls(), 2);
        assert_eq!(local.calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_primary_provider_fails_over() {
        let local = Arc::new(MockInferenceProvider::new("local", "llama").with_fallback("local"));
        let gateway = RoutingInferenceGateway::new(config())
            .with_provider(ProviderRoute::Local, local.clone());

        assert!(!gateway.has_route(ProviderRoute::Cloud));

        let completion = gateway
            .complete(messages(), "system", 0.0, SensitivityHint::Normal)
            .await
            .unwrap();

        assert_eq!(completion.route, ProviderRoute::Local);
        assert_eq!(local.calls(), 1);
    }
}
