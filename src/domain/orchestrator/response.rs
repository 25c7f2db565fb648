//! Results of a turn and of an activation

use serde::{Deserialize, Serialize};

use super::form::ActivationForm;
use crate::domain::conversation::{ConversationId, ConversationStatus};
use crate::domain::template::MatchResult;
use crate::domain::track::DomainTrack;
use crate::domain::validation::ValidationFailure;
use crate::domain::workflow::WorkflowDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClarificationReason {
    MissingField,
    InvalidField,
    AmbiguousField,
    AmbiguousIntent,
}

impl ClarificationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingField => "missing_field",
            Self::InvalidField => "invalid_field",
            Self::AmbiguousField => "ambiguous_field",
            Self::AmbiguousIntent => "ambiguous_intent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub template_id: String,
    pub name: String,
    pub confidence: f64,
}

impl From<&MatchResult> for CandidateSummary {
    fn from(result: &MatchResult) -> Self {
        Self {
            template_id: result.template.id.clone(),
            name: result.template.name.clone(),
            confidence: result.confidence,
        }
    }
}

/// What the user sees after a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrchestratorResponse {
    ClarificationNeeded {
        reason: ClarificationReason,
        #[serde(skip_serializing_if = "Option::is_none")]
        field: Option<String>,
        prompt: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        candidates: Vec<CandidateSummary>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<ValidationFailure>,
    },
    WorkflowReady {
        form: ActivationForm,
    },
    Conversational {
        domain: DomainTrack,
        reply: String,
    },
    /// Nothing was committed; the same message may be sent again
    TransientError {
        message: String,
        retry_safe: bool,
    },
}

impl OrchestratorResponse {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ClarificationNeeded { .. } => "clarification_needed",
            Self::WorkflowReady { .. } => "workflow_ready",
            Self::Conversational { .. } => "conversational",
            Self::TransientError { .. } => "transient_error",
        }
    }

    /// Text stored as the assistant turn
    pub fn assistant_text(&self) -> String {
        match self {
            Self::ClarificationNeeded { prompt, .. } => prompt.clone(),
            Self::WorkflowReady { form } => format!(
                "\"{}\" is ready to activate. Estimated cost {} {}, about {} seconds per run.",
                form.title, form.estimated_cost, form.currency, form.estimated_duration_seconds
            ),
            Self::Conversational { reply, .. } => reply.clone(),
            Self::TransientError { message, .. } => message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub conversation_id: ConversationId,
    pub status: ConversationStatus,
    pub response: OrchestratorResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationOutcome {
    pub conversation_id: ConversationId,
    pub status: ConversationStatus,
    pub workflow: WorkflowDefinition,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_is_tagged() {
        let response = OrchestratorResponse::TransientError {
            message: "try again".to_string(),
            retry_safe: true,
        };
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["type"], "transient_error");
        assert_eq!(json["retry_safe"], true);
        assert_eq!(response.kind(), "transient_error");
    }

    #[test]
    fn test_clarification_omits_empty_fields() {
        let response = OrchestratorResponse::ClarificationNeeded {
            reason: ClarificationReason::MissingField,
            field: Some("wilaya".to_string()),
            prompt: "Which wilaya?".to_string(),
            candidates: vec![],
            error: None,
        };
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["type"], "clarification_needed");
        assert_eq!(json["reason"], "missing_field");
        assert!(json.get("candidates").is_none());
        assert!(json.get("error").is_none());
        assert_eq!(response.assistant_text(), "Which wilaya?");
    }
}
