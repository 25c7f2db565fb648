//! Conversation endpoints

use std::collections::BTreeMap;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::conversation::ConversationId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartConversationRequest {
    pub message: String,
    /// Caller-chosen id, generated when absent
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRequest {
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivateRequest {
    /// Form edits keyed by input name; numbers and booleans are accepted as-is
    #[serde(default)]
    pub overrides: BTreeMap<String, Value>,
}

impl ActivateRequest {
    /// Raw text for the validator; `null` clears an optional input
    pub fn raw_overrides(self) -> BTreeMap<String, String> {
        self.overrides
            .into_iter()
            .map(|(name, value)| {
                let raw = match value {
                    Value::String(s) => s,
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                (name, raw)
            })
            .collect()
    }
}

/// POST /v1/conversations
pub async fn start_conversation(
    State(state): State<AppState>,
    Json(request): Json<StartConversationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let conversation_id = match request.conversation_id {
        Some(id) => ConversationId::new(id)?,
        None => ConversationId::generate(),
    };

    debug!(conversation_id = %conversation_id, "Starting conversation");

    let outcome = state
        .orchestrator
        .process_message(&conversation_id, &request.message)
        .await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

/// POST /v1/conversations/{conversation_id}/messages
pub async fn post_message(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Json(request): Json<MessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let conversation_id = ConversationId::new(conversation_id)?;

    let outcome = state
        .orchestrator
        .process_message(&conversation_id, &request.message)
        .await?;

    Ok(Json(outcome))
}

/// GET /v1/conversations/{conversation_id}
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let conversation_id = ConversationId::new(conversation_id)?;
    let conversation = state.orchestrator.get_conversation(&conversation_id).await?;

    Ok(Json(conversation))
}

/// POST /v1/conversations/{conversation_id}/activate
pub async fn activate(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let conversation_id = ConversationId::new(conversation_id)?;

    // the body is optional, an empty POST activates the form as shown
    let overrides = if body.is_empty() {
        BTreeMap::new()
    } else {
        serde_json::from_slice::<ActivateRequest>(&body)
            .map_err(|e| {
                ApiError::bad_request(format!("Invalid JSON data: {}", e)).with_code("json_parse_error")
            })?
            .raw_overrides()
    };

    let outcome = state.orchestrator.activate(&conversation_id, overrides).await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_start_request_optional_id() {
        let request: StartConversationRequest =
            serde_json::from_str(r#"{"message": "salam"}"#).unwrap();

        assert_eq!(request.message, "salam");
        assert!(request.conversation_id.is_none());
    }

    #[test]
    fn test_raw_overrides() {
        let request: ActivateRequest = serde_json::from_value(json!({
            "overrides": {"reminder_days": 7, "wilaya": "16", "notify_phone": null}
        }))
        .unwrap();

        let raw = request.raw_overrides();

        assert_eq!(raw["reminder_days"], "7");
        assert_eq!(raw["wilaya"], "16");
        assert_eq!(raw["notify_phone"], "");
    }

    #[test]
    fn test_activate_request_defaults() {
        let request: ActivateRequest = serde_json::from_str("{}").unwrap();
        assert!(request.overrides.is_empty());
    }
}
