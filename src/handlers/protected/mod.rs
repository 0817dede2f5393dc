// handlers/protected/mod.rs - JSON API handlers (verified session required)
//
// Route Prefix: /api/*
// Every handler takes an `AuthUser` first, so a missing session is a 401
// before the body is even looked at. Store calls carry the caller's access
// token; ownership is enforced by the store's row-level policy.

pub mod projects; // /api/projects[/:id]
pub mod user;     // /api/user
