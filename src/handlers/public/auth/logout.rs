// handlers/public/auth/logout.rs - POST /auth/logout

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    Extension,
};

use crate::auth::cookies::{append_all, clear_session_cookies};
use crate::middleware::RequestContext;
use crate::state::AppState;

/// POST /auth/logout - revoke the session upstream and clear cookies
///
/// Always ends signed out locally, even if the provider call fails.
pub async fn logout_post(State(state): State<AppState>, Extension(context): Extension<RequestContext>) -> Response {
    if let Some(session) = &context.session {
        if let Err(e) = state.identity.sign_out(&session.access_token).await {
            tracing::warn!("Provider sign-out failed: {}", e);
        }
    }

    let mut response = Redirect::to("/").into_response();
    append_all(response.headers_mut(), clear_session_cookies(&state.config.session));
    response
}
