// handlers/pages/projects.rs - /projects pages and form actions

use axum::{
    extract::{rejection::FormRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Redirect, Response},
    Extension, Form,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{load_projects, page_user};
use crate::backend::{BackendError, ListQuery};
use crate::error::{ApiError, FormFailure};
use crate::handlers::form_body;
use crate::handlers::protected::projects::utils::status_filter;
use crate::handlers::protected::projects::{parse_project_id, PROJECT_NOT_FOUND};
use crate::middleware::{AuthUser, RequestContext};
use crate::models::ProjectStatus;
use crate::state::AppState;
use crate::validate::project::{validate_create_form, validate_update_form};
use crate::validate::ProjectForm;

#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub status: Option<String>,
}

/// GET /projects - all of the caller's projects, optionally filtered
///
/// The raw filter is echoed back as `currentFilter` even when it is not a
/// known status and therefore had no effect.
pub async fn list_get(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Query(filter): Query<FilterQuery>,
) -> Json<Value> {
    let query = ListQuery {
        status: status_filter(filter.status.as_deref()),
        ..ListQuery::default()
    };
    let projects = load_projects(&state, context.caller(), query).await;

    Json(json!({
        "user": page_user(&context),
        "projects": projects,
        "currentFilter": filter.status,
    }))
}

/// GET /projects/:id
pub async fn show_get(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_project_id(&id)?;
    let caller = context.caller().ok_or_else(|| ApiError::not_found(PROJECT_NOT_FOUND))?;

    let project = state.store.get_project(&caller, id).await.map_err(|e| {
        tracing::debug!("Project {} unavailable to {}: {}", id, caller.user_id, e);
        ApiError::not_found(PROJECT_NOT_FOUND)
    })?;

    Ok(Json(json!({
        "user": page_user(&context),
        "project": project,
    })))
}

/// Values a blank new-project form starts with.
fn blank_form_values() -> Value {
    json!({ "name": "", "description": "", "status": ProjectStatus::default().as_str() })
}

/// POST /projects/new - create from the form, then show the new project
pub async fn create_post(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    form: Result<Form<ProjectForm>, FormRejection>,
) -> Result<Response, FormFailure> {
    let user = user.ok_or_else(|| FormFailure::unauthorized().with_values(blank_form_values()))?;
    let form = form_body(form)?;
    let project = validate_create_form(&form, user.id)?;

    let created = state.store.insert_project(&user.caller(), &project).await.map_err(|e| {
        tracing::error!("Failed to create project for {}: {}", user.id, e);
        FormFailure::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create project. Please try again.")
            .with_values(form.values())
    })?;

    tracing::info!("Project {} created by {}", created.id, user.id);
    Ok(Redirect::to(&format!("/projects/{}", created.id)).into_response())
}

/// POST /projects/:id/update
pub async fn update_post(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(id): Path<String>,
    form: Result<Form<ProjectForm>, FormRejection>,
) -> Result<Json<Value>, FormFailure> {
    let user = user.ok_or_else(FormFailure::unauthorized)?;
    let form = form_body(form)?;
    let changes = validate_update_form(&form)?;
    let id = parse_project_id(&id).map_err(|_| FormFailure::new(StatusCode::NOT_FOUND, PROJECT_NOT_FOUND))?;

    match state.store.update_project(&user.caller(), id, &changes).await {
        Ok(_) => Ok(Json(json!({ "success": true }))),
        Err(BackendError::NotFound) => Err(FormFailure::new(StatusCode::NOT_FOUND, PROJECT_NOT_FOUND)),
        Err(e) => {
            tracing::error!("Failed to update project {}: {}", id, e);
            Err(
                FormFailure::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update project. Please try again.")
                    .with_values(form.values()),
            )
        }
    }
}

/// POST /projects/:id/delete
pub async fn delete_post(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(id): Path<String>,
) -> Result<Response, FormFailure> {
    let user = user.ok_or_else(FormFailure::unauthorized)?;
    let id = parse_project_id(&id).map_err(|_| FormFailure::new(StatusCode::NOT_FOUND, PROJECT_NOT_FOUND))?;

    state.store.delete_project(&user.caller(), id).await.map_err(|e| {
        tracing::error!("Failed to delete project {}: {}", id, e);
        FormFailure::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete project. Please try again.")
    })?;

    tracing::info!("Project {} deleted by {}", id, user.id);
    Ok(Redirect::to("/projects").into_response())
}

