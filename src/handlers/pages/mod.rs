// handlers/pages/mod.rs - Page data for the server-rendered UI
//
// These paths sit behind the auth guard, which has already redirected
// anonymous visitors to the login page. Loads return JSON page data; form
// actions answer with a 303 on success or a form failure body.

pub mod dashboard; // GET /dashboard
pub mod projects;  // /projects, /projects/new, /projects/:id[/update|/delete]

use axum::response::Json;
use serde_json::{json, Value};

use crate::backend::{Caller, ListQuery};
use crate::middleware::RequestContext;
use crate::models::Project;
use crate::state::AppState;

/// Project list for a page load. Failures degrade to an empty list.
pub(crate) async fn load_projects(state: &AppState, caller: Option<Caller>, query: ListQuery) -> Vec<Project> {
    let Some(caller) = caller else {
        return Vec::new();
    };
    match state.store.list_projects(&caller, &query).await {
        Ok(page) => page.projects,
        Err(e) => {
            tracing::error!("Failed to load projects for {}: {}", caller.user_id, e);
            Vec::new()
        }
    }
}

/// `{user}` with the verified identity, or null.
pub(crate) fn page_user(context: &RequestContext) -> Value {
    json!(context.user)
}

/// GET /projects/new
pub async fn new_project_get(axum::Extension(context): axum::Extension<RequestContext>) -> Json<Value> {
    Json(json!({ "user": page_user(&context) }))
}
