//! Versioned API endpoints

pub mod conversations;
pub mod templates;
pub mod workflows;

use axum::{
    routing::{get, post},
    Router,
};

use super::state::AppState;

pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/conversations", post(conversations::start_conversation))
        .route(
            "/conversations/{conversation_id}",
            get(conversations::get_conversation),
        )
        .route(
            "/conversations/{conversation_id}/messages",
            post(conversations::post_message),
        )
        .route(
            "/conversations/{conversation_id}/activate",
            post(conversations::activate),
        )
        .route("/templates", get(templates::list_templates))
        .route("/templates/match", post(templates::match_templates))
        .route("/templates/{template_id}", get(templates::get_template))
        .route("/workflows/{workflow_id}", get(workflows::get_workflow))
        .route("/engine/callbacks", post(workflows::engine_callback))
}
