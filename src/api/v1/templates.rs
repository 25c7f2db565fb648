//! Template catalog endpoints

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::template::{MatchResult, Template};
use crate::domain::track::DomainTrack;

#[derive(Debug, Clone, Serialize)]
pub struct TemplateSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub keywords: Vec<String>,
    pub required_inputs: Vec<String>,
    pub optional_inputs: Vec<String>,
    pub estimated_cost: f64,
    pub currency: String,
    pub estimated_duration_seconds: u64,
}

impl From<&Template> for TemplateSummary {
    fn from(template: &Template) -> Self {
        Self {
            id: template.id.clone(),
            name: template.name.clone(),
            description: template.description.clone(),
            category: template.category.clone(),
            keywords: template.keywords.clone(),
            required_inputs: template.required_inputs.iter().map(|i| i.name.clone()).collect(),
            optional_inputs: template.optional_inputs.iter().map(|i| i.name.clone()).collect(),
            estimated_cost: template.estimated_cost,
            currency: template.currency.clone(),
            estimated_duration_seconds: template.estimated_duration_seconds,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TemplateListResponse {
    pub templates: Vec<TemplateSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchRequest {
    pub text: String,
    /// Track whose templates get the category prior
    #[serde(default)]
    pub active_domain: Option<DomainTrack>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchCandidate {
    pub template_id: String,
    pub name: String,
    pub confidence: f64,
    pub matched_keywords: Vec<String>,
}

impl From<&MatchResult> for MatchCandidate {
    fn from(result: &MatchResult) -> Self {
        Self {
            template_id: result.template.id.clone(),
            name: result.template.name.clone(),
            confidence: result.confidence,
            matched_keywords: result.matched_keywords.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchResponse {
    /// Whether a conversation would delegate to the top candidate
    pub confident: bool,
    pub candidates: Vec<MatchCandidate>,
}

/// GET /v1/templates
pub async fn list_templates(State(state): State<AppState>) -> impl IntoResponse {
    let templates = state
        .orchestrator
        .catalog()
        .iter()
        .map(|t| TemplateSummary::from(t.as_ref()))
        .collect();

    Json(TemplateListResponse { templates })
}

/// GET /v1/templates/{template_id}
pub async fn get_template(
    State(state): State<AppState>,
    Path(template_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let template = state
        .orchestrator
        .catalog()
        .get(&template_id)
        .ok_or_else(|| ApiError::not_found(format!("Template '{}' not found", template_id)))?;

    Ok(Json(template.as_ref().clone()))
}

/// POST /v1/templates/match
pub async fn match_templates(
    State(state): State<AppState>,
    Json(request): Json<MatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.text.trim().is_empty() {
        return Err(ApiError::bad_request("text cannot be empty").with_param("text"));
    }

    let results = state
        .orchestrator
        .match_templates(&request.text, request.active_domain);

    let confident = results.first().is_some_and(|top| {
        state
            .orchestrator
            .config()
            .is_confident(top.confidence, results.get(1).map(|r| r.confidence))
    });

    Ok(Json(MatchResponse {
        confident,
        candidates: results.iter().map(MatchCandidate::from).collect(),
    }))
}
