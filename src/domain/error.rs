use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid value for '{field}' ({rule}): {message}")]
    InvalidField {
        field: String,
        rule: String,
        message: String,
    },

    #[error("Ambiguous intent between: {}", candidates.join(", "))]
    AmbiguousIntent { candidates: Vec<String> },

    #[error("Inference unavailable: {message}")]
    InferenceUnavailable { message: String },

    #[error("Missing input '{field}' for template '{template_id}'")]
    MissingInput { template_id: String, field: String },

    #[error("Event publish failure for '{event_id}': {message}")]
    EventPublish { event_id: String, message: String },

    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn invalid_field(
        field: impl Into<String>,
        rule: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            field: field.into(),
            rule: rule.into(),
            message: message.into(),
        }
    }

    pub fn ambiguous_intent(candidates: Vec<String>) -> Self {
        Self::AmbiguousIntent { candidates }
    }

    pub fn inference_unavailable(message: impl Into<String>) -> Self {
        Self::InferenceUnavailable {
            message: message.into(),
        }
    }

    pub fn missing_input(template_id: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingInput {
            template_id: template_id.into(),
            field: field.into(),
        }
    }

    pub fn event_publish(event_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EventPublish {
            event_id: event_id.into(),
            message: message.into(),
        }
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Whether the failure is transient and the same request may be replayed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::InferenceUnavailable { .. } | Self::Provider { .. }
        )
    }
}
