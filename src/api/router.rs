use axum::{middleware, routing::get, Router};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use super::health;
use super::middleware::{logging_middleware, metrics_middleware};
use super::state::AppState;
use super::v1;
use crate::infrastructure::observability::{create_metrics_router, PrometheusMetrics};

/// Full router; `/metrics` is mounted when a recorder is installed
pub fn create_router(state: AppState, metrics: Option<(PrometheusMetrics, String)>) -> Router {
    let mut router = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        .nest("/v1", v1::create_v1_router())
        .with_state(state);

    if let Some((metrics, path)) = metrics {
        router = router.merge(create_metrics_router(metrics, &path));
    }

    router
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::state::test_support;
    use crate::domain::inference::gateway_mock::ScriptedInferenceGateway;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, value)
    }

    #[tokio::test]
    async fn test_conversation_to_activation() {
        let gateway = Arc::new(
            ScriptedInferenceGateway::new()
                .reply(r#"{"value": "0012345678"}"#)
                .reply(r#"{"value": null}"#),
        );
        let router = create_router(test_support::state(gateway), None);

        let (status, body) = send(
            &router,
            "POST",
            "/v1/conversations",
            Some(json!({
                "conversation_id": "conv-http",
                "message": "automate payment tracking for my ccp invoices, account 0012345678"
            })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["response"]["type"], "workflow_ready");
        assert_eq!(body["status"]["state"], "ready");
        assert_eq!(body["response"]["form"]["template_id"], "finance-payment-tracker");

        let (status, body) = send(
            &router,
            "POST",
            "/v1/conversations/conv-http/activate",
            Some(json!({"overrides": {"reminder_days": 5}})),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["workflow"]["inputs"]["reminder_days"], 5);
        let workflow_id = body["workflow"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(&router, "GET", &format!("/v1/workflows/{}", workflow_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["workflow"]["conversation_id"], "conv-http");
        assert!(body["activation"].is_null());

        let (status, body) = send(&router, "GET", "/v1/conversations/conv-http", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"]["state"], "activated");
    }

    #[tokio::test]
    async fn test_activate_before_ready_is_conflict() {
        let gateway = Arc::new(ScriptedInferenceGateway::new().reply("Salam!"));
        let router = create_router(test_support::state(gateway), None);

        send(
            &router,
            "POST",
            "/v1/conversations",
            Some(json!({"conversation_id": "conv-early", "message": "hello"})),
        )
        .await;

        let (status, body) = send(&router, "POST", "/v1/conversations/conv-early/activate", None).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["type"], "conflict_error");
    }

    #[tokio::test]
    async fn test_transient_error_is_ok_body() {
        let gateway = Arc::new(ScriptedInferenceGateway::new().unavailable().unavailable());
        let router = create_router(test_support::state(gateway), None);

        let (status, body) = send(
            &router,
            "POST",
            "/v1/conversations/conv-down/messages",
            Some(json!({"message": "hello"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"]["type"], "transient_error");
        assert_eq!(body["response"]["retry_safe"], true);

        let (status, _) = send(&router, "GET", "/v1/conversations/conv-down", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_template_endpoints() {
        let router = create_router(test_support::state(Arc::new(ScriptedInferenceGateway::new())), None);

        let (status, body) = send(&router, "GET", "/v1/templates", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["templates"].as_array().unwrap().len(), 3);

        let (status, body) = send(&router, "GET", "/v1/templates/sales-lead-scraper", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["category"], "sales");

        let (status, _) = send(&router, "GET", "/v1/templates/unknown", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &router,
            "POST",
            "/v1/templates/match",
            Some(json!({"text": "tracking"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["confident"], false);
        assert_eq!(body["candidates"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_request_id_is_set_and_kept() {
        let router = create_router(test_support::state(Arc::new(ScriptedInferenceGateway::new())), None);

        let response = router
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers().contains_key("x-request-id"));

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("x-request-id", "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["x-request-id"], "req-42");
    }

    #[tokio::test]
    async fn test_health_routes() {
        let router = create_router(test_support::state(Arc::new(ScriptedInferenceGateway::new())), None);

        let (status, _) = send(&router, "GET", "/live", None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&router, "GET", "/ready", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }
}
