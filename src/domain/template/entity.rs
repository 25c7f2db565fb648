//! Automation template entity

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::validation::{InputDeclaration, InputType};
use crate::domain::DomainError;

/// Maximum length for template IDs
pub const MAX_TEMPLATE_ID_LENGTH: usize = 64;

/// Placeholders the materializer fills from the conversation, never from an input
pub const RESERVED_INPUT_NAMES: [&str; 4] =
    ["conversation_id", "workflow_name", "workflow_id", "timestamp"];

/// Lowercase alphanumeric with hyphens or underscores
static TEMPLATE_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*[a-z0-9]$|^[a-z0-9]$").unwrap());

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_currency() -> String {
    "DZD".to_string()
}

/// Parameterized automation blueprint, immutable once loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Domain track name, e.g. `sales`
    pub category: String,
    #[serde(default = "default_version")]
    pub version: String,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub required_inputs: Vec<InputDeclaration>,
    #[serde(default)]
    pub optional_inputs: Vec<InputDeclaration>,
    /// Engine graph with `{{input}}` placeholders
    pub execution_graph: Value,
    pub estimated_cost: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub estimated_duration_seconds: u64,
}

impl Template {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            category: category.into(),
            version: default_version(),
            keywords: Vec::new(),
            required_inputs: Vec::new(),
            optional_inputs: Vec::new(),
            execution_graph: Value::Object(Default::default()),
            estimated_cost: 0.0,
            currency: default_currency(),
            estimated_duration_seconds: 0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_required_input(mut self, input: InputDeclaration) -> Self {
        self.required_inputs.push(input);
        self
    }

    pub fn with_optional_input(mut self, input: InputDeclaration) -> Self {
        self.optional_inputs.push(input);
        self
    }

    pub fn with_execution_graph(mut self, graph: Value) -> Self {
        self.execution_graph = graph;
        self
    }

    pub fn with_estimate(mut self, cost: f64, duration_seconds: u64) -> Self {
        self.estimated_cost = cost;
        self.estimated_duration_seconds = duration_seconds;
        self
    }

    /// Looks up a declared input, required first
    pub fn input(&self, name: &str) -> Option<&InputDeclaration> {
        self.required_inputs
            .iter()
            .chain(self.optional_inputs.iter())
            .find(|input| input.name == name)
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required_inputs.iter().any(|input| input.name == name)
    }

    /// All declared inputs in form order
    pub fn inputs(&self) -> impl Iterator<Item = (&InputDeclaration, bool)> {
        self.required_inputs
            .iter()
            .map(|input| (input, true))
            .chain(self.optional_inputs.iter().map(|input| (input, false)))
    }

    /// Checks structural invariants before a template enters the catalog
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.id.is_empty() {
            return Err(DomainError::validation("Template ID cannot be empty"));
        }

        if self.id.len() > MAX_TEMPLATE_ID_LENGTH {
            return Err(DomainError::validation(format!(
                "Template ID too long: {} characters (max {})",
                self.id.len(),
                MAX_TEMPLATE_ID_LENGTH
            )));
        }

        if !TEMPLATE_ID_PATTERN.is_match(&self.id) {
            return Err(DomainError::validation(format!(
                "Invalid template ID format '{}': must be lowercase alphanumeric with hyphens or underscores",
                self.id
            )));
        }

        if self.name.trim().is_empty() {
            return Err(DomainError::validation(format!(
                "Template '{}' has no name",
                self.id
            )));
        }

        if self.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(DomainError::validation(format!(
                "Template '{}' has no keywords",
                self.id
            )));
        }

        if !self.estimated_cost.is_finite() || self.estimated_cost < 0.0 {
            return Err(DomainError::validation(format!(
                "Template '{}' has an invalid estimated cost",
                self.id
            )));
        }

        let mut seen = HashSet::new();

        for (input, _) in self.inputs() {
            if !seen.insert(input.name.as_str()) {
                return Err(DomainError::validation(format!(
                    "Template '{}' declares input '{}' twice",
                    self.id, input.name
                )));
            }

            if RESERVED_INPUT_NAMES.contains(&input.name.as_str()) {
                return Err(DomainError::validation(format!(
                    "Input name '{}' of template '{}' is reserved",
                    input.name, self.id
                )));
            }

            if let Some(pattern) = &input.pattern {
                if let Err(e) = Regex::new(pattern) {
                    return Err(DomainError::validation(format!(
                        "Input '{}' of template '{}' has an invalid pattern: {}",
                        input.name, self.id, e
                    )));
                }
            }

            if input.input_type == InputType::Select && input.options.is_empty() {
                return Err(DomainError::validation(format!(
                    "Select input '{}' of template '{}' has no options",
                    input.name, self.id
                )));
            }

            if let (Some(min), Some(max)) = (input.min, input.max) {
                if min > max {
                    return Err(DomainError::validation(format!(
                        "Input '{}' of template '{}' has min greater than max",
                        input.name, self.id
                    )));
                }
            }
        }

        Ok(())
    }
}
