//! n8n-compatible execution engine client

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::circuit_breaker::CircuitBreaker;
use crate::domain::engine::{EngineHandle, ExecutionEngine};
use crate::domain::workflow::WorkflowDefinition;
use crate::domain::DomainError;
use crate::infrastructure::llm::{HttpClient, HttpClientTrait};
use crate::infrastructure::observability::record_engine_call;

const ENGINE_NAME: &str = "n8n";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub api_key_header: String,
    pub timeout_secs: u64,
    /// Consecutive failures before the breaker opens
    pub failure_threshold: u32,
    pub reset_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5678".to_string(),
            api_key: None,
            api_key_header: "X-N8N-API-KEY".to_string(),
            timeout_secs: 30,
            failure_threshold: 5,
            reset_timeout_secs: 60,
        }
    }
}

/// Creates then activates workflows over the engine's REST API
#[derive(Debug)]
pub struct HttpExecutionEngine<C: HttpClientTrait = HttpClient> {
    client: C,
    base_url: String,
    api_key: Option<String>,
    api_key_header: String,
    breaker: CircuitBreaker,
}

impl HttpExecutionEngine<HttpClient> {
    pub fn from_config(config: &EngineConfig) -> Result<Self, DomainError> {
        let client =
            HttpClient::with_timeout(ENGINE_NAME, Duration::from_secs(config.timeout_secs))?;
        Ok(Self::new(client, config))
    }
}

impl<C: HttpClientTrait> HttpExecutionEngine<C> {
    pub fn new(client: C, config: &EngineConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            api_key_header: config.api_key_header.clone(),
            breaker: CircuitBreaker::new(
                ENGINE_NAME,
                config.failure_threshold,
                Duration::from_secs(config.reset_timeout_secs),
            ),
        }
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        match &self.api_key {
            Some(key) => vec![(self.api_key_header.as_str(), key.as_str())],
            None => Vec::new(),
        }
    }

    /// Engine body: the materialized graph plus the workflow name
    fn workflow_body(definition: &WorkflowDefinition) -> Value {
        let mut body = match &definition.payload {
            Value::Object(map) => map.clone(),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("nodes".to_string(), other.clone());
                map
            }
        };

        body.insert("name".to_string(), Value::String(definition.name.clone()));
        body.entry("nodes").or_insert_with(|| json!([]));
        body.entry("connections").or_insert_with(|| json!({}));
        body.entry("settings").or_insert_with(|| json!({}));

        Value::Object(body)
    }

    async fn create_and_activate(
        &self,
        definition: &WorkflowDefinition,
    ) -> Result<EngineHandle, DomainError> {
        let created = self
            .client
            .post_json(
                &format!("{}/api/v1/workflows", self.base_url),
                self.headers(),
                &Self::workflow_body(definition),
            )
            .await?;

        let handle = match created.get("id") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                return Err(DomainError::provider(
                    ENGINE_NAME,
                    "Workflow creation response has no id",
                ))
            }
        };

        self.client
            .post_json(
                &format!("{}/api/v1/workflows/{}/activate", self.base_url, handle),
                self.headers(),
                &json!({}),
            )
            .await?;

        Ok(EngineHandle::new(handle))
    }
}

#[async_trait]
impl<C: HttpClientTrait> ExecutionEngine for HttpExecutionEngine<C> {
    async fn activate(&self, definition: &WorkflowDefinition) -> Result<EngineHandle, DomainError> {
        if !self.breaker.is_available() {
            record_engine_call(ENGINE_NAME, false);
            return Err(DomainError::provider(
                ENGINE_NAME,
                "Circuit breaker open, engine calls suspended",
            ));
        }

        let start = Instant::now();
        let result = self.create_and_activate(definition).await;
        record_engine_call(ENGINE_NAME, result.is_ok());

        match &result {
            Ok(handle) => {
                self.breaker.record_success();
                debug!(
                    workflow_id = %definition.id,
                    handle = %handle,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Engine activation succeeded"
                );
            }
            Err(e) => {
                self.breaker.record_failure();
                warn!(workflow_id = %definition.id, error = %e, "Engine activation failed");
            }
        }

        result
    }

    fn name(&self) -> &'static str {
        ENGINE_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::events::test_support::definition;
    use crate::infrastructure::llm::http_mock::MockHttpClient;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: String) -> EngineConfig {
        EngineConfig {
            base_url,
            api_key: Some("n8n-key".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_creates_then_activates() {
        let server = MockServer::start().await;
        let definition = definition();

        Mock::given(method("POST"))
            .and(path("/api/v1/workflows"))
            .and(header("X-N8N-API-KEY", "n8n-key"))
            .and(body_partial_json(json!({"name": definition.name})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "wf-17"})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/v1/workflows/wf-17/activate"))
            .and(header("X-N8N-API-KEY", "n8n-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"active": true})))
            .expect(1)
            .mount(&server)
            .await;

        let engine = HttpExecutionEngine::from_config(&config(server.uri())).unwrap();
        let handle = engine.activate(&definition).await.unwrap();

        assert_eq!(handle.as_str(), "wf-17");
    }

    #[tokio::test]
    async fn test_numeric_id_is_accepted() {
        let client = MockHttpClient::new()
            .with_response("http://engine/api/v1/workflows", json!({"id": 42}))
            .with_response("http://engine/api/v1/workflows/42/activate", json!({}));
        let engine = HttpExecutionEngine::new(client, &config("http://engine".to_string()));

        let handle = engine.activate(&definition()).await.unwrap();
        assert_eq!(handle.as_str(), "42");
    }

    #[tokio::test]
    async fn test_server_error_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let engine = HttpExecutionEngine::from_config(&config(server.uri())).unwrap();
        let result = engine.activate(&definition()).await;

        assert!(matches!(result, Err(DomainError::Provider { .. })));
    }

    #[tokio::test]
    async fn test_breaker_stops_calls() {
        let client = MockHttpClient::new().with_error("http://engine/api/v1/workflows", "down");
        let engine = HttpExecutionEngine::new(
            client,
            &EngineConfig {
                failure_threshold: 2,
                ..config("http://engine".to_string())
            },
        );
        let definition = definition();

        assert!(engine.activate(&definition).await.is_err());
        assert!(engine.activate(&definition).await.is_err());
        assert!(engine.activate(&definition).await.is_err());

        assert_eq!(engine.client.requests().len(), 2);
    }

    #[test]
    fn test_workflow_body_keeps_graph() {
        let mut definition = definition();
        definition.payload = json!({"nodes": [{"name": "Start"}]});

        let body = HttpExecutionEngine::<MockHttpClient>::workflow_body(&definition);

        assert_eq!(body["nodes"][0]["name"], "Start");
        assert_eq!(body["name"], definition.name.as_str());
        assert_eq!(body["connections"], json!({}));
    }
}
