use axum::http::{header, HeaderMap, StatusCode};
use serde_json::json;
use uuid::Uuid;

use crate::backend::BackendError;
use crate::error::FormFailure;

/// Where a failed confirmation link lands.
pub const AUTH_ERROR_REDIRECT: &str = "/auth/login?error=Could%20not%20authenticate";

const PROVIDER_UNAVAILABLE: &str = "Authentication service unavailable. Please try again.";

/// Accept a caller-supplied redirect only if it stays on this site.
pub fn safe_redirect(candidate: Option<&str>, default: &str) -> String {
    match candidate {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => path.to_string(),
        _ => default.to_string(),
    }
}

/// Scheme and host the browser used to reach us, for links in outgoing email.
pub fn request_origin(headers: &HeaderMap, secure: bool) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or(if secure { "https" } else { "http" });
    format!("{}://{}", scheme, host)
}

/// 64 hex chars, inside the 43..=128 range PKCE allows.
pub fn generate_code_verifier() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Map an identity provider failure onto a form failure. Refusals are shown
/// verbatim; anything else is logged and replaced with a generic message.
pub fn provider_failure(err: BackendError, email: &str) -> FormFailure {
    let values = json!({ "email": email });
    match err {
        BackendError::Rejected { message, .. } => {
            tracing::warn!("Identity provider refused {}: {}", email, message);
            FormFailure::new(StatusCode::BAD_REQUEST, message).with_values(values)
        }
        other => {
            tracing::error!("Identity provider call failed: {}", other);
            FormFailure::new(StatusCode::INTERNAL_SERVER_ERROR, PROVIDER_UNAVAILABLE).with_values(values)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn only_same_site_paths_are_followed() {
        assert_eq!(safe_redirect(Some("/projects/1"), "/dashboard"), "/projects/1");
        assert_eq!(safe_redirect(Some("/projects?status=active"), "/dashboard"), "/projects?status=active");
        assert_eq!(safe_redirect(None, "/dashboard"), "/dashboard");
        assert_eq!(safe_redirect(Some(""), "/dashboard"), "/dashboard");
        assert_eq!(safe_redirect(Some("https://evil.example"), "/dashboard"), "/dashboard");
        assert_eq!(safe_redirect(Some("//evil.example"), "/dashboard"), "/dashboard");
        assert_eq!(safe_redirect(Some("/\\evil.example"), "/dashboard"), "/dashboard");
    }

    #[test]
    fn origin_prefers_forwarded_proto() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("hub.example.com"));
        assert_eq!(request_origin(&headers, false), "http://hub.example.com");
        assert_eq!(request_origin(&headers, true), "https://hub.example.com");

        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert_eq!(request_origin(&headers, false), "https://hub.example.com");
    }

    #[test]
    fn code_verifier_is_pkce_sized() {
        let verifier = generate_code_verifier();
        assert_eq!(verifier.len(), 64);
        assert!(verifier.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(verifier, generate_code_verifier());
    }

    #[test]
    fn provider_refusal_is_shown_but_transport_detail_is_not() {
        let refused = provider_failure(BackendError::rejected(400, "Invalid login credentials"), "a@b.co");
        assert_eq!(refused.status, StatusCode::BAD_REQUEST);
        assert_eq!(refused.error, "Invalid login credentials");
        assert_eq!(refused.values, Some(json!({ "email": "a@b.co" })));

        let broken = provider_failure(BackendError::Decode("expected value at line 1".to_string()), "a@b.co");
        assert_eq!(broken.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(broken.error, PROVIDER_UNAVAILABLE);
    }
}
