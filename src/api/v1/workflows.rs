//! Workflow and engine status endpoints

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::info;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::infrastructure::engine::EngineCallback;

/// GET /v1/workflows/{workflow_id}
pub async fn get_workflow(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.workflows.status(&workflow_id).await?;

    Ok(Json(view))
}

/// POST /v1/engine/callbacks
pub async fn engine_callback(
    State(state): State<AppState>,
    Json(callback): Json<EngineCallback>,
) -> Result<impl IntoResponse, ApiError> {
    info!(
        handle = %callback.handle,
        status = %callback.status,
        "Engine callback received"
    );

    let activation = state.workflows.apply_engine_callback(callback).await?;

    Ok(Json(activation))
}
