use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::SecurityConfig;
use crate::handlers::{pages, protected, public};
use crate::middleware::{guard_middleware, session_middleware};
use crate::state::AppState;

/// Full application router.
///
/// Every request passes the session verifier first, then the auth guard,
/// then its handler.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security);

    Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .merge(auth_routes())
        // Guarded pages
        .merge(page_routes())
        // JSON API
        .merge(project_routes())
        .merge(user_routes())
        // Request pipeline: session (outer) -> guard -> handler
        .layer(middleware::from_fn(guard_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), session_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_routes() -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/auth/login", get(auth::login_get).post(auth::login_post))
        .route("/auth/signup", post(auth::signup_post))
        .route("/auth/callback", get(auth::callback_get))
        .route("/auth/logout", post(auth::logout_post))
}

fn page_routes() -> Router<AppState> {
    use pages::{dashboard, projects};

    Router::new()
        .route("/dashboard", get(dashboard::dashboard_get))
        .route("/projects", get(projects::list_get))
        .route("/projects/new", get(pages::new_project_get).post(projects::create_post))
        .route("/projects/:id", get(projects::show_get))
        .route("/projects/:id/update", post(projects::update_post))
        .route("/projects/:id/delete", post(projects::delete_post))
}

fn project_routes() -> Router<AppState> {
    use protected::projects::{collection, record};

    Router::new()
        .route("/api/projects", get(collection::get).post(collection::post))
        .route(
            "/api/projects/:id",
            get(record::get).patch(record::patch).delete(record::delete),
        )
}

fn user_routes() -> Router<AppState> {
    use protected::user;

    Router::new().route("/api/user", get(user::get).patch(user::patch))
}

/// Credentialed CORS for the configured origins, or no CORS headers at all.
fn cors_layer(config: &SecurityConfig) -> CorsLayer {
    if !config.enable_cors {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("Ignoring invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}
