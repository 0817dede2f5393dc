// handlers/protected/projects/collection.rs - /api/projects

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::utils::{status_filter, Pagination};
use crate::backend::ListQuery;
use crate::error::ApiError;
use crate::handlers::json_body;
use crate::middleware::AuthUser;
use crate::state::AppState;
use crate::validate::{project::validate_create, ProjectInput};

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

/// GET /api/projects - the caller's projects, newest first
pub async fn get(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, ApiError> {
    let page = Pagination::from_params(params.limit.as_deref(), params.offset.as_deref(), &state.config.api);
    let query = ListQuery {
        status: status_filter(params.status.as_deref()),
        limit: Some(page.limit),
        offset: page.offset,
        count: true,
    };

    let result = state
        .store
        .list_projects(&user.caller(), &query)
        .await
        .map_err(|e| ApiError::upstream("Failed to fetch projects", e))?;

    Ok(Json(json!({
        "projects": result.projects,
        "pagination": page.to_json(result.total),
    })))
}

/// POST /api/projects - create a project owned by the caller
pub async fn post(
    State(state): State<AppState>,
    user: AuthUser,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let input = ProjectInput::from_json(json_body(&body)?);
    let project = validate_create(&input, user.id)?;

    let created = state
        .store
        .insert_project(&user.caller(), &project)
        .await
        .map_err(|e| ApiError::upstream("Failed to create project", e))?;

    tracing::info!("Project {} created by {}", created.id, user.id);
    Ok((StatusCode::CREATED, Json(json!({ "project": created }))))
}
