use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;

use super::{BackendError, Caller, IdentityProvider, ListQuery, ProjectPage, ProjectStore, SignUpRequest};
use crate::auth::{Session, User};
use crate::config::BackendConfig;
use crate::models::{NewProject, Profile, ProfileChanges, Project, ProjectChanges};

/// PostgREST code for "`.single()` matched zero rows".
const NO_ROWS_CODE: &str = "PGRST116";
const OBJECT_MEDIA_TYPE: &str = "application/vnd.pgrst.object+json";

/// HTTP client for a hosted Supabase project: GoTrue under `/auth/v1` and
/// PostgREST under `/rest/v1`. Every data call carries the caller's access
/// token so row-level security applies.
#[derive(Clone)]
pub struct SupabaseBackend {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl From<TokenResponse> for Session {
    fn from(token: TokenResponse) -> Self {
        let expires_at = token
            .expires_at
            .or_else(|| token.expires_in.map(|secs| Utc::now().timestamp() + secs));
        Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
        }
    }
}

/// Union of the GoTrue and PostgREST error shapes.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<Value>,
    error_code: Option<String>,
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl SupabaseBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
        })
    }

    fn auth(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/auth/v1/{}", self.base_url, path))
            .header("apikey", &self.anon_key)
    }

    fn rest(&self, method: Method, table: &str, caller: &Caller) -> RequestBuilder {
        self.client
            .request(method, format!("{}/rest/v1/{}", self.base_url, table))
            .header("apikey", &self.anon_key)
            .bearer_auth(&caller.access_token)
    }

    async fn token(&self, grant_type: &str, body: Value) -> Result<Session, BackendError> {
        let resp = self
            .auth(Method::POST, "token")
            .bearer_auth(&self.anon_key)
            .query(&[("grant_type", grant_type)])
            .json(&body)
            .send()
            .await?;

        let token: TokenResponse = expect_json(resp).await?;
        Ok(token.into())
    }
}

async fn expect_success(resp: Response) -> Result<Response, BackendError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let text = resp.text().await.unwrap_or_default();
    Err(error_from_body(status, &text))
}

async fn expect_json<T: DeserializeOwned>(resp: Response) -> Result<T, BackendError> {
    expect_success(resp)
        .await?
        .json::<T>()
        .await
        .map_err(|e| BackendError::Decode(e.to_string()))
}

fn error_from_body(status: u16, text: &str) -> BackendError {
    let body: ErrorBody = serde_json::from_str(text).unwrap_or_default();

    let code = body.error_code.or_else(|| match body.code {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    });

    if code.as_deref() == Some(NO_ROWS_CODE) {
        return BackendError::NotFound;
    }

    let message = body
        .message
        .or(body.msg)
        .or(body.error_description)
        .or(body.error)
        .unwrap_or_else(|| format!("HTTP {}", status));

    BackendError::Rejected { status, code, message }
}

/// Total from a PostgREST `Content-Range` header such as `0-49/60` or `*/0`.
fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit_once('/').and_then(|(_, total)| total.parse().ok())
}

#[async_trait]
impl IdentityProvider for SupabaseBackend {
    async fn get_user(&self, access_token: &str) -> Result<User, BackendError> {
        let resp = self.auth(Method::GET, "user").bearer_auth(access_token).send().await?;
        expect_json(resp).await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, BackendError> {
        self.token("refresh_token", json!({ "refresh_token": refresh_token })).await
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        self.token("password", json!({ "email": email, "password": password })).await
    }

    async fn sign_up(&self, request: SignUpRequest) -> Result<(), BackendError> {
        let resp = self
            .auth(Method::POST, "signup")
            .bearer_auth(&self.anon_key)
            .query(&[("redirect_to", request.email_redirect_to.as_str())])
            .json(&json!({
                "email": request.email,
                "password": request.password,
                "code_challenge": request.code_challenge,
                "code_challenge_method": "plain",
            }))
            .send()
            .await?;

        expect_success(resp).await.map(|_| ())
    }

    async fn exchange_code_for_session(&self, auth_code: &str, code_verifier: &str) -> Result<Session, BackendError> {
        self.token("pkce", json!({ "auth_code": auth_code, "code_verifier": code_verifier }))
            .await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let resp = self.auth(Method::POST, "logout").bearer_auth(access_token).send().await?;
        expect_success(resp).await.map(|_| ())
    }
}

#[async_trait]
impl ProjectStore for SupabaseBackend {
    async fn list_projects(&self, caller: &Caller, query: &ListQuery) -> Result<ProjectPage, BackendError> {
        let mut req = self
            .rest(Method::GET, "projects", caller)
            .query(&[("select", "*"), ("order", "created_at.desc")]);

        if let Some(status) = query.status {
            req = req.query(&[("status", format!("eq.{}", status))]);
        }
        if let Some(limit) = query.limit {
            req = req.query(&[("limit", limit.to_string())]);
        }
        if query.offset > 0 {
            req = req.query(&[("offset", query.offset.to_string())]);
        }
        if query.count {
            req = req.header("Prefer", "count=exact");
        }

        let resp = expect_success(req.send().await?).await?;
        let total = resp
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total);

        let projects = resp
            .json::<Vec<Project>>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        Ok(ProjectPage { projects, total })
    }

    async fn get_project(&self, caller: &Caller, id: Uuid) -> Result<Project, BackendError> {
        let resp = self
            .rest(Method::GET, "projects", caller)
            .query(&[("select", "*".to_string()), ("id", format!("eq.{}", id))])
            .header(header::ACCEPT, OBJECT_MEDIA_TYPE)
            .send()
            .await?;
        expect_json(resp).await
    }

    async fn insert_project(&self, caller: &Caller, project: &NewProject) -> Result<Project, BackendError> {
        let resp = self
            .rest(Method::POST, "projects", caller)
            .query(&[("select", "*")])
            .header("Prefer", "return=representation")
            .header(header::ACCEPT, OBJECT_MEDIA_TYPE)
            .json(project)
            .send()
            .await?;
        expect_json(resp).await
    }

    async fn update_project(&self, caller: &Caller, id: Uuid, changes: &ProjectChanges) -> Result<Project, BackendError> {
        let resp = self
            .rest(Method::PATCH, "projects", caller)
            .query(&[("select", "*".to_string()), ("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .header(header::ACCEPT, OBJECT_MEDIA_TYPE)
            .json(changes)
            .send()
            .await?;
        expect_json(resp).await
    }

    async fn delete_project(&self, caller: &Caller, id: Uuid) -> Result<(), BackendError> {
        let resp = self
            .rest(Method::DELETE, "projects", caller)
            .query(&[("id", format!("eq.{}", id))])
            .send()
            .await?;
        expect_success(resp).await.map(|_| ())
    }

    async fn get_profile(&self, caller: &Caller) -> Result<Profile, BackendError> {
        let resp = self
            .rest(Method::GET, "profiles", caller)
            .query(&[("select", "*".to_string()), ("id", format!("eq.{}", caller.user_id))])
            .header(header::ACCEPT, OBJECT_MEDIA_TYPE)
            .send()
            .await?;
        expect_json(resp).await
    }

    async fn update_profile(&self, caller: &Caller, changes: &ProfileChanges) -> Result<Profile, BackendError> {
        let resp = self
            .rest(Method::PATCH, "profiles", caller)
            .query(&[("select", "*".to_string()), ("id", format!("eq.{}", caller.user_id))])
            .header("Prefer", "return=representation")
            .header(header::ACCEPT, OBJECT_MEDIA_TYPE)
            .json(changes)
            .send()
            .await?;
        expect_json(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_range_total() {
        assert_eq!(parse_content_range_total("0-49/60"), Some(60));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-49/*"), None);
        assert_eq!(parse_content_range_total("garbage"), None);
    }

    #[test]
    fn single_row_miss_is_not_found() {
        let body = r#"{"code":"PGRST116","details":"The result contains 0 rows","hint":null,"message":"JSON object requested, multiple (or no) rows returned"}"#;
        assert!(matches!(error_from_body(406, body), BackendError::NotFound));
    }

    #[test]
    fn gotrue_error_keeps_provider_message() {
        let body = r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#;
        match error_from_body(400, body) {
            BackendError::Rejected { status, code, message } => {
                assert_eq!(status, 400);
                assert_eq!(code.as_deref(), Some("invalid_credentials"));
                assert_eq!(message, "Invalid login credentials");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn unparseable_error_body_falls_back_to_status() {
        match error_from_body(502, "<html>bad gateway</html>") {
            BackendError::Rejected { message, code, .. } => {
                assert_eq!(message, "HTTP 502");
                assert_eq!(code, None);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn token_response_derives_expiry_from_expires_in() {
        let token = TokenResponse {
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_at: None,
            expires_in: Some(3600),
        };
        let session: Session = token.into();
        let expires_at = session.expires_at.unwrap();
        assert!(expires_at > Utc::now().timestamp() + 3500);
    }
}
