// handlers/protected/projects/mod.rs - Project CRUD

pub mod collection; // GET, POST /api/projects
pub mod record;     // GET, PATCH, DELETE /api/projects/:id
pub mod utils;

pub use utils::{parse_project_id, Pagination, PROJECT_NOT_FOUND};
