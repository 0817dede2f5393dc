use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use project_hub::config::{config, BackendKind};
use project_hub::{app, AppState};

#[derive(Parser)]
#[command(name = "project-hub")]
#[command(about = "Authenticated project tracker API")]
#[command(version)]
struct Args {
    /// Interface to bind (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides PORT / PROJECT_HUB_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Backend to use: supabase or memory (overrides BACKEND)
    #[arg(long)]
    backend: Option<BackendKind>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up SUPABASE_URL etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("project_hub=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();

    // Environment defaults, then flags on top
    let mut config = config().clone();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(backend) = args.backend {
        config.backend.kind = backend;
    }

    tracing::info!("Starting project-hub in {:?} mode", config.environment);
    if config.is_development() && config.backend.kind == BackendKind::Memory {
        tracing::info!("Development mode: sign up through /auth/signup, then follow the logged callback code");
    }

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::from_config(config).context("invalid configuration")?;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("project-hub listening on http://{}", bind_addr);
    axum::serve(listener, app(state)).await.context("server error")?;
    Ok(())
}
