//! REST endpoints for inspecting active forms.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::form::FormFlowEngine;

/// Shared state for form routes.
#[derive(Clone)]
pub struct FormRouteState {
    pub engine: Arc<FormFlowEngine>,
}

fn not_found(user_id: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": format!("No active form for {user_id}")})),
    )
        .into_response()
}

/// GET /api/forms
///
/// Users with a form in progress.
async fn list_forms(State(state): State<FormRouteState>) -> impl IntoResponse {
    let users = state.engine.active_users().await;
    Json(serde_json::json!({
        "count": users.len(),
        "users": users,
    }))
}

/// GET /api/forms/{user_id}
async fn get_progress(
    State(state): State<FormRouteState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    match state.engine.progress(&user_id).await {
        Some(progress) => Json(progress).into_response(),
        None => not_found(&user_id),
    }
}

/// GET /api/forms/{user_id}/question
async fn get_question(
    State(state): State<FormRouteState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    match state.engine.current_question(&user_id).await {
        Some(question) => Json(question).into_response(),
        None => not_found(&user_id),
    }
}

/// Build the form status routes.
pub fn form_routes(state: FormRouteState) -> Router {
    Router::new()
        .route("/api/forms", get(list_forms))
        .route("/api/forms/{user_id}", get(get_progress))
        .route("/api/forms/{user_id}/question", get(get_question))
        .with_state(state)
}
