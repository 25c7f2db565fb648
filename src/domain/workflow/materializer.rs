//! Template plus findings to a concrete workflow definition

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use super::definition::{
    ComponentRef, ProvenanceManifest, WorkflowDefinition, WorkflowId, MANIFEST_SCHEMA_VERSION,
};
use super::error::WorkflowError;
use crate::domain::conversation::ConversationId;
use crate::domain::template::{Template, RESERVED_INPUT_NAMES};

/// `{{name}}`, whitespace inside the braces is tolerated
static PLACEHOLDER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap());

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MaterializerConfig {
    /// Execution engine listed in the manifest components
    pub engine_name: String,
    pub jurisdiction: String,
}

impl Default for MaterializerConfig {
    fn default() -> Self {
        Self {
            engine_name: "n8n".to_string(),
            jurisdiction: "DZ".to_string(),
        }
    }
}

/// Per-conversation facts the definition is built from
#[derive(Debug, Clone)]
pub struct MaterializeContext {
    pub conversation_id: ConversationId,
    /// Models invoked during the conversation, in first-use order
    pub model_ids: Vec<String>,
    pub workflow_name: Option<String>,
}

impl MaterializeContext {
    pub fn new(conversation_id: ConversationId) -> Self {
        Self {
            conversation_id,
            model_ids: Vec::new(),
            workflow_name: None,
        }
    }

    pub fn with_model_ids(mut self, model_ids: Vec<String>) -> Self {
        self.model_ids = model_ids;
        self
    }

    pub fn with_workflow_name(mut self, name: impl Into<String>) -> Self {
        self.workflow_name = Some(name.into());
        self
    }
}

enum Resolution<'a> {
    Found(&'a Value),
    /// Declared optional input with neither a finding nor a default
    Absent,
    Unknown,
}

struct Bindings<'a> {
    values: &'a BTreeMap<String, Value>,
    declared: BTreeSet<&'a str>,
    unknown: BTreeSet<String>,
}

impl<'a> Bindings<'a> {
    fn resolve(&self, name: &str) -> Resolution<'a> {
        match self.values.get(name) {
            Some(value) => Resolution::Found(value),
            None if self.declared.contains(name) => Resolution::Absent,
            None => Resolution::Unknown,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowMaterializer {
    config: MaterializerConfig,
}

impl WorkflowMaterializer {
    pub fn new(config: MaterializerConfig) -> Self {
        Self { config }
    }

    /// Builds the definition, failing if a required input has no finding
    pub fn materialize(
        &self,
        template: &Template,
        findings: &BTreeMap<String, Value>,
        context: &MaterializeContext,
    ) -> Result<WorkflowDefinition, WorkflowError> {
        let mut inputs = BTreeMap::new();

        for declaration in &template.required_inputs {
            match findings.get(&declaration.name) {
                Some(value) if !value.is_null() => {
                    inputs.insert(declaration.name.clone(), value.clone());
                }
                _ => {
                    return Err(WorkflowError::missing_input(
                        &template.id,
                        &declaration.name,
                    ))
                }
            }
        }

        for declaration in &template.optional_inputs {
            let value = findings
                .get(&declaration.name)
                .filter(|v| !v.is_null())
                .or(declaration.default.as_ref());

            if let Some(value) = value {
                inputs.insert(declaration.name.clone(), value.clone());
            }
        }

        let id = WorkflowId::generate();
        let now = Utc::now();
        let name = context.workflow_name.clone().unwrap_or_else(|| {
            format!("{} ({})", template.name, &id.as_str()[..8])
        });

        let mut values = inputs.clone();
        values.insert(
            "conversation_id".to_string(),
            Value::String(context.conversation_id.to_string()),
        );
        values.insert("workflow_name".to_string(), Value::String(name.clone()));
        values.insert("workflow_id".to_string(), Value::String(id.to_string()));
        values.insert("timestamp".to_string(), Value::String(now.to_rfc3339()));

        let mut bindings = Bindings {
            values: &values,
            declared: template
                .inputs()
                .map(|(input, _)| input.name.as_str())
                .chain(RESERVED_INPUT_NAMES)
                .collect(),
            unknown: BTreeSet::new(),
        };

        let payload = substitute(&template.execution_graph, &mut bindings);

        if !bindings.unknown.is_empty() {
            warn!(
                template_id = %template.id,
                placeholders = ?bindings.unknown,
                "Execution graph references undeclared placeholders"
            );
        }

        let manifest = ProvenanceManifest {
            schema_version: MANIFEST_SCHEMA_VERSION.to_string(),
            template_id: template.id.clone(),
            template_version: template.version.clone(),
            model_ids: dedup(&context.model_ids),
            components: vec![
                ComponentRef::new("orchestrator", env!("CARGO_PKG_VERSION")),
                ComponentRef::new("workflow-materializer", env!("CARGO_PKG_VERSION")),
                ComponentRef::new(&self.config.engine_name, "external"),
            ],
            jurisdiction: self.config.jurisdiction.clone(),
            audit_trace_id: format!("AUDIT-{}", id),
            generated_at: now,
        };

        Ok(WorkflowDefinition {
            id,
            name,
            template_id: template.id.clone(),
            conversation_id: context.conversation_id.clone(),
            inputs,
            payload,
            estimated_cost: template.estimated_cost,
            currency: template.currency.clone(),
            estimated_duration_seconds: template.estimated_duration_seconds,
            manifest,
            created_at: now,
        })
    }
}

fn dedup(ids: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

fn substitute(value: &Value, bindings: &mut Bindings<'_>) -> Value {
    match value {
        Value::String(text) => substitute_str(text, bindings),
        Value::Array(items) => Value::Array(items.iter().map(|v| substitute(v, bindings)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute(v, bindings)))
                .collect::<Map<String, Value>>(),
        ),
        other => other.clone(),
    }
}

fn substitute_str(text: &str, bindings: &mut Bindings<'_>) -> Value {
    // A lone placeholder keeps the value's JSON type
    if let Some(caps) = PLACEHOLDER_PATTERN.captures(text) {
        let whole = caps.get(0).map(|m| m.as_str().len()) == Some(text.len());

        if whole {
            let name = &caps[1];

            return match bindings.resolve(name) {
                Resolution::Found(value) => value.clone(),
                Resolution::Absent => Value::Null,
                Resolution::Unknown => {
                    bindings.unknown.insert(name.to_string());
                    Value::String(text.to_string())
                }
            };
        }
    }

    let mut unknown = Vec::new();
    let replaced = PLACEHOLDER_PATTERN.replace_all(text, |caps: &Captures| {
        match bindings.resolve(&caps[1]) {
            Resolution::Found(value) => value_to_string(value),
            Resolution::Absent => String::new(),
            Resolution::Unknown => {
                unknown.push(caps[1].to_string());
                caps[0].to_string()
            }
        }
    });
    let replaced = replaced.into_owned();

    bindings.unknown.extend(unknown);
    Value::String(replaced)
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
