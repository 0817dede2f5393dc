mod common;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Duration;
use reqwest::header::COOKIE;
use reqwest::StatusCode;

use common::{cookie_header, location, set_cookies, TestServer};
use project_hub::backend::MemoryBackend;
use project_hub::config::AppConfig;

fn cookie_value(cookie: &str, name: &str) -> Option<String> {
    cookie
        .split("; ")
        .find_map(|pair| pair.strip_prefix(&format!("{}=", name)))
        .map(str::to_string)
}

#[tokio::test]
async fn anonymous_visitors_are_sent_to_login() -> Result<()> {
    let server = TestServer::start().await?;

    for path in ["/dashboard", "/projects", "/projects/new", "/projects/some-id"] {
        let res = server.get(path).send().await?;
        assert_eq!(res.status(), StatusCode::SEE_OTHER, "{}", path);
        assert_eq!(location(&res), Some(format!("/auth/login?redirectTo={}", path)));
    }
    Ok(())
}

#[tokio::test]
async fn signed_in_users_skip_the_auth_pages() -> Result<()> {
    let server = TestServer::start().await?;
    let session = server.sign_in_new_user().await?;

    let res = server.get("/auth/login").header(COOKIE, &session.cookie).send().await?;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res).as_deref(), Some("/dashboard"));

    let res = server.get("/dashboard").header(COOKIE, &session.cookie).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn login_page_sanitizes_redirect_target() -> Result<()> {
    let server = TestServer::start().await?;

    let body: serde_json::Value = server.get("/auth/login").send().await?.json().await?;
    assert_eq!(body["redirectTo"], "/dashboard");

    let body: serde_json::Value = server
        .get("/auth/login?redirectTo=/projects/new")
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["redirectTo"], "/projects/new");

    let body: serde_json::Value = server
        .get("/auth/login?redirectTo=//evil.example")
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["redirectTo"], "/dashboard");
    Ok(())
}

#[tokio::test]
async fn garbage_session_cookie_is_cleared() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server
        .get("/dashboard")
        .header(COOKIE, "sb-access-token=not-a-jwt; sb-refresh-token=nope")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);

    let cookies = set_cookies(&res);
    assert!(cookies.iter().any(|c| c.starts_with("sb-access-token=;") && c.contains("Max-Age=0")));
    assert!(cookies.iter().any(|c| c.starts_with("sb-refresh-token=;") && c.contains("Max-Age=0")));
    Ok(())
}

#[tokio::test]
async fn expiring_session_is_refreshed_and_rewritten() -> Result<()> {
    // every access token is inside the refresh margin from the start
    let backend = MemoryBackend::with_access_ttl(Duration::seconds(5)).with_refresh_reuse(Duration::zero());
    let server = TestServer::start_with_backend(AppConfig::development(), Arc::new(backend)).await?;
    let session = server.sign_in_new_user().await?;
    let old_refresh = cookie_value(&session.cookie, "sb-refresh-token").context("no refresh cookie")?;

    let res = server.get("/dashboard").header(COOKIE, &session.cookie).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let cookies = set_cookies(&res);
    assert!(cookies.iter().any(|c| c.starts_with("sb-access-token=ey")));
    let rotated = cookie_header(&res);
    let new_refresh = cookie_value(&rotated, "sb-refresh-token").context("refresh cookie not rewritten")?;
    assert_ne!(new_refresh, old_refresh);

    // the rotated cookies carry the session forward
    let res = server.get("/dashboard").header(COOKIE, &rotated).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    // the old refresh token was consumed
    let res = server.get("/dashboard").header(COOKIE, &session.cookie).send().await?;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res).as_deref(), Some("/auth/login?redirectTo=/dashboard"));
    assert!(set_cookies(&res)
        .iter()
        .any(|c| c.starts_with("sb-refresh-token=;") && c.contains("Max-Age=0")));
    Ok(())
}
