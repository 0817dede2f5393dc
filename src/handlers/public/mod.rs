// handlers/public/mod.rs - Public handlers (no session required)
//
// Service info, health and the session acquisition flow under /auth/*.
// The auth guard still bounces signed-in users away from the login and
// signup pages.

pub mod auth;

use axum::response::Json;
use serde_json::{json, Value};

/// GET / - service info
pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "project-hub",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Authenticated project tracker backed by a hosted auth and data service",
        "endpoints": {
            "home": "/ (public)",
            "health": "/health (public)",
            "auth": "/auth/login, /auth/signup, /auth/callback, /auth/logout (public)",
            "pages": "/dashboard, /projects[/new|/:id] (session required, redirects to login)",
            "api": "/api/projects[/:id], /api/user (session required, 401 otherwise)",
        }
    }))
}

/// GET /health - liveness only; the hosted backend is not probed.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
    }))
}
