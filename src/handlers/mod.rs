// handlers/mod.rs - Handler tiers
//
// Public (no session) → Protected (`AuthUser` required, JSON API under /api/*)
// → Pages (guarded by the auth guard, JSON page data for the web UI)

pub mod pages;     // /dashboard, /projects/* (guarded paths)
pub mod protected; // /api/* (401 without a verified session)
pub mod public;    // /, /health, /auth/*

use axum::body::Bytes;
use axum::extract::rejection::FormRejection;
use axum::Form;
use serde_json::Value;

use crate::error::{ApiError, FormFailure};

/// Parse a raw request body as JSON. An empty body is invalid JSON too.
pub(crate) fn json_body(body: &Bytes) -> Result<Value, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!("Rejecting request body: {}", e);
        ApiError::invalid_json()
    })
}

/// Unwrap an urlencoded form, turning extractor failures into a 400 form failure.
pub(crate) fn form_body<T>(form: Result<Form<T>, FormRejection>) -> Result<T, FormFailure> {
    form.map(|Form(inner)| inner).map_err(|e| {
        tracing::debug!("Rejecting form body: {}", e);
        FormFailure::new(e.status(), "Invalid form submission")
    })
}
