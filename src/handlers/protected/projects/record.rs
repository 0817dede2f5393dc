// handlers/protected/projects/record.rs - /api/projects/:id

use axum::{
    body::Bytes,
    extract::{Path, State},
    response::Json,
};
use serde_json::{json, Value};

use super::utils::{parse_project_id, PROJECT_NOT_FOUND};
use crate::error::ApiError;
use crate::handlers::json_body;
use crate::middleware::AuthUser;
use crate::state::AppState;
use crate::validate::{project::validate_update, ProjectInput};

/// GET /api/projects/:id
///
/// Any store failure reads as "not found"; the caller cannot tell a missing
/// row from someone else's.
pub async fn get(State(state): State<AppState>, user: AuthUser, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let id = parse_project_id(&id)?;

    let project = state.store.get_project(&user.caller(), id).await.map_err(|e| {
        tracing::debug!("Project {} unavailable to {}: {}", id, user.id, e);
        ApiError::not_found(PROJECT_NOT_FOUND)
    })?;

    Ok(Json(json!({ "project": project })))
}

/// PATCH /api/projects/:id
pub async fn patch(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let input = ProjectInput::from_json(json_body(&body)?);
    let changes = validate_update(&input)?;
    let id = parse_project_id(&id)?;

    let project = state
        .store
        .update_project(&user.caller(), id, &changes)
        .await
        .map_err(|e| ApiError::from_store(PROJECT_NOT_FOUND, "Failed to update project", e))?;

    Ok(Json(json!({ "project": project })))
}

/// DELETE /api/projects/:id
///
/// The store deletes hidden rows silently, so existence is checked first to
/// report 404 for projects the caller cannot see.
pub async fn delete(State(state): State<AppState>, user: AuthUser, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let id = parse_project_id(&id)?;
    let caller = user.caller();

    if let Err(e) = state.store.get_project(&caller, id).await {
        tracing::debug!("Refusing delete of {} for {}: {}", id, user.id, e);
        return Err(ApiError::not_found(PROJECT_NOT_FOUND));
    }

    state
        .store
        .delete_project(&caller, id)
        .await
        .map_err(|e| ApiError::upstream("Failed to delete project", e))?;

    tracing::info!("Project {} deleted by {}", id, user.id);
    Ok(Json(json!({ "success": true })))
}
