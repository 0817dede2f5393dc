#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::redirect::Policy;
use reqwest::{RequestBuilder, Response, StatusCode};
use uuid::Uuid;

use project_hub::backend::MemoryBackend;
use project_hub::config::AppConfig;
use project_hub::{app, AppState};

pub const PASSWORD: &str = "secret123";

/// One in-process server per test, each with its own in-memory backend.
pub struct TestServer {
    pub base_url: String,
    pub backend: Arc<MemoryBackend>,
    pub client: reqwest::Client,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        Self::start_with(AppConfig::development()).await
    }

    pub async fn start_with(config: AppConfig) -> Result<Self> {
        Self::start_with_backend(config, Arc::new(MemoryBackend::new())).await
    }

    pub async fn start_with_backend(config: AppConfig, backend: Arc<MemoryBackend>) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let state = AppState::with_memory_backend(config, backend.clone());
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app(state)).await;
        });

        // Redirects are assertions here, not something to follow
        let client = reqwest::Client::builder().redirect(Policy::none()).build()?;

        Ok(Self { base_url, backend, client })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    pub fn patch(&self, path: &str) -> RequestBuilder {
        self.client.patch(self.url(path))
    }

    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.client.delete(self.url(path))
    }

    /// Register a fresh account and sign in through the login form.
    /// Returns the `Cookie` header value carrying the session.
    pub async fn sign_in_new_user(&self) -> Result<Session> {
        let email = format!("user-{}@example.com", Uuid::new_v4().simple());
        let user = self.backend.create_user(&email, PASSWORD).await?;
        let cookie = self.sign_in(&email, PASSWORD).await?;
        Ok(Session { user_id: user.id, email, cookie })
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<String> {
        let res = self
            .post("/auth/login")
            .form(&[("email", email), ("password", password)])
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::SEE_OTHER, "login failed: {}", res.status());
        Ok(cookie_header(&res))
    }

    /// Create a project through the JSON API and return its id.
    pub async fn create_project(&self, session: &Session, name: &str, status: &str) -> Result<String> {
        let res = self
            .post("/api/projects")
            .header(COOKIE, &session.cookie)
            .json(&serde_json::json!({ "name": name, "status": status }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "create failed: {}", res.status());
        let body: serde_json::Value = res.json().await?;
        body["project"]["id"]
            .as_str()
            .map(str::to_string)
            .context("created project has no id")
    }
}

pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    pub cookie: String,
}

/// Non-empty `name=value` pairs from every `Set-Cookie` on the response,
/// joined as a request `Cookie` header.
pub fn cookie_header(res: &Response) -> String {
    res.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|c| c.split(';').next())
        .filter(|pair| !pair.ends_with('='))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Raw `Set-Cookie` values.
pub fn set_cookies(res: &Response) -> Vec<String> {
    res.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok().map(str::to_string))
        .collect()
}

pub fn location(res: &Response) -> Option<String> {
    res.headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
