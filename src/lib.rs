pub mod app;
pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod state;
pub mod validate;

pub use app::app;
pub use state::AppState;
