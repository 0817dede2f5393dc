// handlers/public/auth/login.rs - GET/POST /auth/login

use axum::{
    extract::{rejection::FormRejection, Query, State},
    response::{IntoResponse, Json, Redirect, Response},
    Form,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::utils::{provider_failure, safe_redirect};
use crate::auth::cookies::{append_all, session_cookies};
use crate::error::FormFailure;
use crate::handlers::form_body;
use crate::middleware::guard::HOME_PATH;
use crate::state::AppState;
use crate::validate::{credentials::validate_login, LoginForm};

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(rename = "redirectTo")]
    pub redirect_to: Option<String>,
    /// Set by the callback when a confirmation link failed.
    pub error: Option<String>,
}

/// GET /auth/login - page data for the login form
pub async fn login_get(Query(query): Query<LoginQuery>) -> Json<Value> {
    Json(json!({
        "redirectTo": safe_redirect(query.redirect_to.as_deref(), HOME_PATH),
        "error": query.error,
    }))
}

/// POST /auth/login - password sign-in
///
/// On success the session cookies are written and the browser is sent on to
/// `redirectTo` with a 303. Failures come back as a form failure echoing the
/// email.
pub async fn login_post(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Response, FormFailure> {
    let form = form_body(form)?;
    let credentials = validate_login(&form)?;

    let session = state
        .identity
        .sign_in_with_password(&credentials.email, &credentials.password)
        .await
        .map_err(|e| provider_failure(e, &credentials.email))?;

    tracing::debug!("Signed in {}", credentials.email);
    let target = safe_redirect(query.redirect_to.as_deref(), HOME_PATH);
    let mut response = Redirect::to(&target).into_response();
    append_all(response.headers_mut(), session_cookies(&session, &state.config.session));
    Ok(response)
}
