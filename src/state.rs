use std::sync::Arc;

use crate::backend::{IdentityProvider, MemoryBackend, ProjectStore, SupabaseBackend};
use crate::config::{AppConfig, BackendKind};

/// Shared, immutable application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn ProjectStore>,
}

impl AppState {
    pub fn new(config: AppConfig, identity: Arc<dyn IdentityProvider>, store: Arc<dyn ProjectStore>) -> Self {
        Self {
            config: Arc::new(config),
            identity,
            store,
        }
    }

    /// Build the backend selected by `config.backend.kind`.
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let state = match config.backend.kind {
            BackendKind::Supabase => {
                let backend = Arc::new(SupabaseBackend::new(&config.backend)?);
                tracing::info!("Using Supabase backend at {}", config.backend.supabase_url);
                Self::new(config, backend.clone(), backend)
            }
            BackendKind::Memory => {
                tracing::warn!("Using in-memory backend; all data is lost on restart");
                Self::with_memory_backend(config, Arc::new(MemoryBackend::new()))
            }
        };
        Ok(state)
    }

    pub fn with_memory_backend(config: AppConfig, backend: Arc<MemoryBackend>) -> Self {
        Self::new(config, backend.clone(), backend)
    }
}
