// handlers/pages/dashboard.rs - GET /dashboard

use axum::{extract::State, response::Json, Extension};
use serde_json::{json, Value};

use super::{load_projects, page_user};
use crate::backend::ListQuery;
use crate::middleware::RequestContext;
use crate::state::AppState;

/// The signed-in user and their most recent projects.
pub async fn dashboard_get(State(state): State<AppState>, Extension(context): Extension<RequestContext>) -> Json<Value> {
    let query = ListQuery {
        limit: Some(state.config.api.dashboard_recent_limit),
        ..ListQuery::default()
    };
    let projects = load_projects(&state, context.caller(), query).await;

    Json(json!({
        "user": page_user(&context),
        "projects": projects,
    }))
}
