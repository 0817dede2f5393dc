// handlers/protected/user.rs - /api/user

use axum::{body::Bytes, extract::State, response::Json};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::handlers::json_body;
use crate::middleware::AuthUser;
use crate::state::AppState;
use crate::validate::{profile::validate_update, ProfileInput};

/// GET /api/user - identity plus profile
///
/// A missing or unreadable profile row is not an error; its fields are null.
pub async fn get(State(state): State<AppState>, user: AuthUser) -> Json<Value> {
    let profile = match state.store.get_profile(&user.caller()).await {
        Ok(profile) => Some(profile),
        Err(e) => {
            tracing::debug!("No profile for {}: {}", user.id, e);
            None
        }
    };

    Json(json!({
        "user": {
            "id": user.id,
            "email": user.email,
            "fullName": profile.as_ref().and_then(|p| p.full_name.clone()),
            "avatarUrl": profile.as_ref().and_then(|p| p.avatar_url.clone()),
            "createdAt": profile.as_ref().map(|p| p.created_at),
        }
    }))
}

/// PATCH /api/user - update the caller's profile
pub async fn patch(State(state): State<AppState>, user: AuthUser, body: Bytes) -> Result<Json<Value>, ApiError> {
    let input = ProfileInput::from_json(json_body(&body)?);
    let changes = validate_update(&input)?;

    let profile = state
        .store
        .update_profile(&user.caller(), &changes)
        .await
        .map_err(|e| ApiError::upstream("Failed to update profile", e))?;

    Ok(Json(json!({
        "user": {
            "id": user.id,
            "email": user.email,
            "fullName": profile.full_name,
            "avatarUrl": profile.avatar_url,
        }
    })))
}
