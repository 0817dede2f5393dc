// handlers/public/auth/signup.rs - POST /auth/signup

use axum::{
    extract::{rejection::FormRejection, State},
    http::HeaderMap,
    response::{IntoResponse, Json, Response},
    Form,
};
use serde_json::json;

use super::utils::{generate_code_verifier, provider_failure, request_origin};
use crate::auth::cookies::{append_all, verifier_cookie};
use crate::backend::SignUpRequest;
use crate::error::FormFailure;
use crate::handlers::form_body;
use crate::state::AppState;
use crate::validate::{credentials::validate_signup, Credentials, SignupForm};

/// POST /auth/signup - create an account pending email confirmation
///
/// The confirmation link comes back through `/auth/callback`, which needs the
/// PKCE verifier stored here in a cookie.
pub async fn signup_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Result<Form<SignupForm>, FormRejection>,
) -> Result<Response, FormFailure> {
    let form = form_body(form)?;
    let Credentials { email, password } = validate_signup(&form)?;

    let config = &state.config.session;
    let verifier = generate_code_verifier();
    let request = SignUpRequest {
        email: email.clone(),
        password,
        email_redirect_to: format!("{}/auth/callback", request_origin(&headers, config.secure_cookies)),
        code_challenge: verifier.clone(),
    };

    state
        .identity
        .sign_up(request)
        .await
        .map_err(|e| provider_failure(e, &email))?;

    tracing::info!("Sign-up pending confirmation for {}", email);
    let mut response = Json(json!({ "success": true, "email": email })).into_response();
    append_all(response.headers_mut(), verifier_cookie(&verifier, config));
    Ok(response)
}
