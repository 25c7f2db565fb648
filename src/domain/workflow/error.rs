//! Materialization errors

use thiserror::Error;

use crate::domain::DomainError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum WorkflowError {
    /// A required input reached materialization without a value
    #[error("Template '{template_id}' is missing required input '{field}'")]
    MissingInput { template_id: String, field: String },

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),
}

impl WorkflowError {
    pub fn missing_input(template_id: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingInput {
            template_id: template_id.into(),
            field: field.into(),
        }
    }

    pub fn invalid_template(message: impl Into<String>) -> Self {
        Self::InvalidTemplate(message.into())
    }
}

impl From<WorkflowError> for DomainError {
    fn from(error: WorkflowError) -> Self {
        match error {
            WorkflowError::MissingInput { template_id, field } => {
                DomainError::missing_input(template_id, field)
            }
            WorkflowError::InvalidTemplate(message) => DomainError::internal(message),
        }
    }
}
