use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::session::RequestContext;

/// Paths that require a verified session.
pub const PROTECTED_PREFIXES: [&str; 2] = ["/dashboard", "/projects"];

/// Paths that only make sense when logged out.
pub const AUTH_ONLY_PREFIXES: [&str; 2] = ["/auth/login", "/auth/signup"];

pub const LOGIN_PATH: &str = "/auth/login";
pub const HOME_PATH: &str = "/dashboard";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Continue,
    Redirect { target: String, status: StatusCode },
}

fn matches_any(path: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|prefix| path.starts_with(prefix))
}

/// Decide whether a request may proceed to its handler.
pub fn guard(path: &str, session_present: bool) -> GuardDecision {
    if !session_present && matches_any(path, &PROTECTED_PREFIXES) {
        return GuardDecision::Redirect {
            target: format!("{}?redirectTo={}", LOGIN_PATH, path),
            status: StatusCode::SEE_OTHER,
        };
    }

    if session_present && matches_any(path, &AUTH_ONLY_PREFIXES) {
        return GuardDecision::Redirect {
            target: HOME_PATH.to_string(),
            status: StatusCode::SEE_OTHER,
        };
    }

    GuardDecision::Continue
}

/// Auth guard middleware. Must run after the session middleware.
pub async fn guard_middleware(request: Request, next: Next) -> Response {
    let session_present = request
        .extensions()
        .get::<RequestContext>()
        .map_or(false, RequestContext::is_authenticated);

    match guard(request.uri().path(), session_present) {
        GuardDecision::Continue => next.run(request).await,
        GuardDecision::Redirect { target, status } => {
            tracing::debug!("Guard redirecting {} to {}", request.uri().path(), target);
            (status, [(header::LOCATION, target)]).into_response()
        }
    }
}
