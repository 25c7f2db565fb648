//! Slack-compatible webhook notifications

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::{debug, info};

use crate::domain::event::{DomainEvent, EventHandler, EventType, WorkflowCreatedPayload};
use crate::domain::DomainError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Incoming webhook URL; notifications are only logged when unset
    pub webhook_url: Option<String>,
    /// Signs the body with HMAC-SHA256 when set
    pub signing_secret: Option<String>,
    pub timeout_secs: u64,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            signing_secret: None,
            timeout_secs: 10,
        }
    }
}

/// Announces new workflows on a chat webhook
#[derive(Debug)]
pub struct NotificationHandler {
    client: Client,
    webhook_url: Option<String>,
    signing_secret: Option<String>,
}

impl NotificationHandler {
    pub fn new(config: &NotificationsConfig) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                DomainError::configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            webhook_url: config.webhook_url.clone().filter(|url| !url.trim().is_empty()),
            signing_secret: config.signing_secret.clone().filter(|s| !s.is_empty()),
        })
    }

    fn sign(secret: &str, body: &str) -> Result<String, DomainError> {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| DomainError::configuration(format!("Invalid signing secret: {}", e)))?;
        mac.update(body.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn message(payload: &WorkflowCreatedPayload) -> Value {
        let text = format!(
            "New automation ready: {} ({})",
            payload.name, payload.template_id
        );

        json!({
            "text": text,
            "blocks": [
                {
                    "type": "section",
                    "text": {"type": "mrkdwn", "text": format!("*{}*", text)}
                },
                {
                    "type": "section",
                    "fields": [
                        {"type": "mrkdwn", "text": format!("*Workflow*\n{}", payload.workflow_id)},
                        {"type": "mrkdwn", "text": format!(
                            "*Estimated cost*\n{:.2} {}",
                            payload.estimated_cost, payload.currency
                        )},
                        {"type": "mrkdwn", "text": format!(
                            "*Estimated duration*\n{} s",
                            payload.estimated_duration_seconds
                        )},
                        {"type": "mrkdwn", "text": format!("*Audit trace*\n{}", payload.audit_trace_id)}
                    ]
                }
            ]
        })
    }
}

#[async_trait]
impl EventHandler for NotificationHandler {
    fn name(&self) -> &'static str {
        "notification"
    }

    fn handles(&self, event_type: EventType) -> bool {
        event_type == EventType::WorkflowCreated
    }

    async fn handle(&self, event: &DomainEvent) -> Result<(), DomainError> {
        let payload: WorkflowCreatedPayload = event.payload_as()?;

        let Some(url) = &self.webhook_url else {
            info!(
                event_id = %event.id,
                workflow_id = %payload.workflow_id,
                template_id = %payload.template_id,
                "Workflow created (no notification webhook configured)"
            );
            return Ok(());
        };

        let body = serde_json::to_string(&Self::message(&payload)).map_err(|e| {
            DomainError::internal(format!("Failed to serialize notification: {}", e))
        })?;

        let mut request = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("X-Idempotency-Key", event.id.as_str());

        if let Some(secret) = &self.signing_secret {
            request = request.header(
                "X-Webhook-Signature",
                format!("sha256={}", Self::sign(secret, &body)?),
            );
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| DomainError::provider("notification", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::provider(
                "notification",
                format!("Webhook returned status {}", status.as_u16()),
            ));
        }

        debug!(event_id = %event.id, status = status.as_u16(), "Notification delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::DomainEvent;
    use crate::infrastructure::events::test_support::definition;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn handler(url: Option<String>, secret: Option<&str>) -> NotificationHandler {
        NotificationHandler::new(&NotificationsConfig {
            webhook_url: url,
            signing_secret: secret.map(str::to_string),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_posts_signed_message() {
        let server = MockServer::start().await;
        let event = DomainEvent::workflow_created(&definition()).unwrap();

        Mock::given(method("POST"))
            .and(path("/hooks/ops"))
            .and(header("X-Idempotency-Key", event.id.as_str()))
            .and(header_exists("X-Webhook-Signature"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let handler = handler(Some(format!("{}/hooks/ops", server.uri())), Some("s3cret"));
        handler.handle(&event).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8(requests[0].body.clone()).unwrap();
        let signature = requests[0]
            .headers
            .get("X-Webhook-Signature")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();

        assert_eq!(
            signature,
            format!("sha256={}", NotificationHandler::sign("s3cret", &body).unwrap())
        );
        let message: Value = serde_json::from_str(&body).unwrap();
        assert!(message["text"].as_str().unwrap().starts_with("New automation ready"));
    }

    #[tokio::test]
    async fn test_error_status_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let event = DomainEvent::workflow_created(&definition()).unwrap();
        let result = handler(Some(server.uri()), None).handle(&event).await;

        assert!(matches!(result, Err(DomainError::Provider { .. })));
    }

    #[tokio::test]
    async fn test_without_url_only_logs() {
        let event = DomainEvent::workflow_created(&definition()).unwrap();
        assert!(handler(None, None).handle(&event).await.is_ok());
        assert!(handler(Some("  ".to_string()), None)
            .handle(&event)
            .await
            .is_ok());
    }

    #[test]
    fn test_signature_depends_on_secret() {
        let a = NotificationHandler::sign("one", "{}").unwrap();
        let b = NotificationHandler::sign("one", "{}").unwrap();
        let c = NotificationHandler::sign("two", "{}").unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_message_carries_text_and_blocks() {
        let event = DomainEvent::workflow_created(&definition()).unwrap();
        let payload: WorkflowCreatedPayload = event.payload_as().unwrap();
        let message = NotificationHandler::message(&payload);

        assert!(message["text"]
            .as_str()
            .unwrap()
            .contains("finance-payment-tracker"));
        assert_eq!(message["blocks"].as_array().unwrap().len(), 2);
    }
}
