// handlers/public/auth/callback.rs - GET /auth/callback

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use super::utils::{safe_redirect, AUTH_ERROR_REDIRECT};
use crate::auth::cookies::{append_all, clear_verifier_cookie, parse_cookie, session_cookies};
use crate::middleware::guard::HOME_PATH;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub next: Option<String>,
}

/// GET /auth/callback - exchange an emailed auth code for a session
pub async fn callback_get(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let config = &state.config.session;
    let next = safe_redirect(query.next.as_deref(), HOME_PATH);

    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        return Redirect::to(AUTH_ERROR_REDIRECT).into_response();
    };
    let verifier = parse_cookie(&headers, &config.verifier_cookie).unwrap_or_default();

    match state.identity.exchange_code_for_session(&code, &verifier).await {
        Ok(session) => {
            let mut response = Redirect::to(&next).into_response();
            append_all(response.headers_mut(), session_cookies(&session, config));
            append_all(response.headers_mut(), clear_verifier_cookie(config));
            response
        }
        Err(e) => {
            tracing::warn!("Auth code exchange failed: {}", e);
            Redirect::to(AUTH_ERROR_REDIRECT).into_response()
        }
    }
}
