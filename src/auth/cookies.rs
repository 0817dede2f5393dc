use axum::http::{header, HeaderMap, HeaderValue};

use super::Session;
use crate::config::SessionConfig;

/// Read a single cookie value from the request `Cookie` header(s).
pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for cookie in headers.get_all(header::COOKIE) {
        let Ok(s) = cookie.to_str() else { continue };
        for part in s.split(';') {
            let p = part.trim();
            if let Some((k, v)) = p.split_once('=') {
                if k == name && !v.is_empty() {
                    return Some(v.to_string());
                }
            }
        }
    }
    None
}

fn build(name: &str, value: &str, max_age: u64, config: &SessionConfig) -> Option<HeaderValue> {
    let mut cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}", name, value, max_age);
    if config.secure_cookies {
        cookie.push_str("; Secure");
    }
    match HeaderValue::from_str(&cookie) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("Dropping unrepresentable cookie '{}': {}", name, e);
            None
        }
    }
}

/// `Set-Cookie` values that store both session tokens.
pub fn session_cookies(session: &Session, config: &SessionConfig) -> Vec<HeaderValue> {
    [
        build(&config.access_cookie, &session.access_token, config.cookie_max_age_secs, config),
        build(&config.refresh_cookie, &session.refresh_token, config.cookie_max_age_secs, config),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// `Set-Cookie` values that expire both session tokens.
pub fn clear_session_cookies(config: &SessionConfig) -> Vec<HeaderValue> {
    [
        build(&config.access_cookie, "", 0, config),
        build(&config.refresh_cookie, "", 0, config),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// PKCE verifier cookie, short-lived: it only has to survive the email round trip.
pub fn verifier_cookie(verifier: &str, config: &SessionConfig) -> Option<HeaderValue> {
    build(&config.verifier_cookie, verifier, 60 * 60 * 24, config)
}

pub fn clear_verifier_cookie(config: &SessionConfig) -> Option<HeaderValue> {
    build(&config.verifier_cookie, "", 0, config)
}

/// Append `Set-Cookie` values to a response header map.
pub fn append_all(headers: &mut HeaderMap, cookies: impl IntoIterator<Item = HeaderValue>) {
    for cookie in cookies {
        headers.append(header::SET_COOKIE, cookie);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn headers(cookie: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        h
    }

    #[test]
    fn finds_named_cookie() {
        let h = headers("theme=dark; sb-access-token=abc.def.ghi; sb-refresh-token=r1");
        assert_eq!(parse_cookie(&h, "sb-access-token").as_deref(), Some("abc.def.ghi"));
        assert_eq!(parse_cookie(&h, "sb-refresh-token").as_deref(), Some("r1"));
        assert_eq!(parse_cookie(&h, "missing"), None);
    }

    #[test]
    fn empty_cookie_counts_as_absent() {
        let h = headers("sb-access-token=; other=1");
        assert_eq!(parse_cookie(&h, "sb-access-token"), None);
    }

    #[test]
    fn session_cookies_carry_attributes() {
        let mut config = AppConfig::development().session;
        config.secure_cookies = true;
        let session = Session {
            access_token: "a.b.c".to_string(),
            refresh_token: "r".to_string(),
            expires_at: None,
        };
        let cookies = session_cookies(&session, &config);
        assert_eq!(cookies.len(), 2);
        let first = cookies[0].to_str().unwrap();
        assert!(first.starts_with("sb-access-token=a.b.c;"));
        assert!(first.contains("HttpOnly"));
        assert!(first.contains("Secure"));
    }

    #[test]
    fn cleared_cookies_expire_immediately() {
        let config = AppConfig::development().session;
        for cookie in clear_session_cookies(&config) {
            assert!(cookie.to_str().unwrap().contains("Max-Age=0"));
        }
    }
}
