use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub session: SessionConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Supabase,
    Memory,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "supabase" => Ok(BackendKind::Supabase),
            "memory" | "in-memory" => Ok(BackendKind::Memory),
            other => Err(format!("unknown backend '{}', expected 'supabase' or 'memory'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub access_cookie: String,
    pub refresh_cookie: String,
    pub verifier_cookie: String,
    pub secure_cookies: bool,
    pub cookie_max_age_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub default_list_limit: u32,
    /// Upper bound for `limit` on the project list. `None` leaves it uncapped.
    pub max_list_limit: Option<u32>,
    pub dashboard_recent_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Some(port) = env::var("PROJECT_HUB_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.server.port = port;
        }

        // Backend overrides
        if let Ok(v) = env::var("BACKEND") {
            self.backend.kind = v.parse().unwrap_or(self.backend.kind);
        }
        if let Ok(v) = env::var("SUPABASE_URL") {
            self.backend.supabase_url = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("SUPABASE_ANON_KEY").or_else(|_| env::var("SUPABASE_PUBLISHABLE_KEY")) {
            self.backend.supabase_anon_key = v;
        }
        if let Ok(v) = env::var("BACKEND_TIMEOUT_SECS") {
            self.backend.request_timeout_secs = v.parse().unwrap_or(self.backend.request_timeout_secs);
        }

        // Session overrides
        if let Ok(v) = env::var("SESSION_ACCESS_COOKIE") {
            self.session.access_cookie = v;
        }
        if let Ok(v) = env::var("SESSION_REFRESH_COOKIE") {
            self.session.refresh_cookie = v;
        }
        if let Ok(v) = env::var("SESSION_SECURE_COOKIES") {
            self.session.secure_cookies = v.parse().unwrap_or(self.session.secure_cookies);
        }
        if let Ok(v) = env::var("SESSION_COOKIE_MAX_AGE_SECS") {
            self.session.cookie_max_age_secs = v.parse().unwrap_or(self.session.cookie_max_age_secs);
        }

        // API overrides
        if let Ok(v) = env::var("API_DEFAULT_LIST_LIMIT") {
            self.api.default_list_limit = v.parse().unwrap_or(self.api.default_list_limit);
        }
        if let Ok(v) = env::var("API_MAX_LIST_LIMIT") {
            self.api.max_list_limit = v.parse().ok();
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        self
    }

    /// Check that the selected backend has what it needs to start.
    pub fn is_development(&self) -> bool {
        matches!(self.environment, Environment::Development)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.kind == BackendKind::Supabase {
            if self.backend.supabase_url.is_empty() {
                return Err(ConfigError::Missing("SUPABASE_URL"));
            }
            if url::Url::parse(&self.backend.supabase_url).is_err() {
                return Err(ConfigError::Invalid {
                    key: "SUPABASE_URL",
                    value: self.backend.supabase_url.clone(),
                });
            }
            if self.backend.supabase_anon_key.is_empty() {
                return Err(ConfigError::Missing("SUPABASE_ANON_KEY"));
            }
        }
        if self.api.default_list_limit == 0 {
            return Err(ConfigError::Invalid {
                key: "API_DEFAULT_LIST_LIMIT",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    fn session_defaults(secure_cookies: bool) -> SessionConfig {
        SessionConfig {
            access_cookie: "sb-access-token".to_string(),
            refresh_cookie: "sb-refresh-token".to_string(),
            verifier_cookie: "sb-code-verifier".to_string(),
            secure_cookies,
            cookie_max_age_secs: 60 * 60 * 24 * 7, // 1 week
        }
    }

    fn api_defaults() -> ApiConfig {
        ApiConfig {
            default_list_limit: 50,
            max_list_limit: None,
            dashboard_recent_limit: 5,
        }
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            backend: BackendConfig {
                kind: BackendKind::Memory,
                supabase_url: String::new(),
                supabase_anon_key: String::new(),
                request_timeout_secs: 30,
            },
            session: Self::session_defaults(false),
            api: Self::api_defaults(),
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            backend: BackendConfig {
                kind: BackendKind::Supabase,
                supabase_url: String::new(),
                supabase_anon_key: String::new(),
                request_timeout_secs: 10,
            },
            session: Self::session_defaults(true),
            api: Self::api_defaults(),
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            backend: BackendConfig {
                kind: BackendKind::Supabase,
                supabase_url: String::new(),
                supabase_anon_key: String::new(),
                request_timeout_secs: 5,
            },
            session: Self::session_defaults(true),
            api: Self::api_defaults(),
            security: SecurityConfig {
                enable_cors: false,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.backend.kind, BackendKind::Memory);
        assert_eq!(config.api.default_list_limit, 50);
        assert_eq!(config.api.max_list_limit, None);
        assert!(!config.session.secure_cookies);
        assert!(config.validate().is_ok());
        assert!(config.is_development());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(!config.is_development());
        assert_eq!(config.backend.kind, BackendKind::Supabase);
        assert!(config.session.secure_cookies);
        assert_eq!(config.api.dashboard_recent_limit, 5);
    }

    #[test]
    fn supabase_backend_requires_url_and_key() {
        let mut config = AppConfig::production();
        assert!(matches!(config.validate(), Err(ConfigError::Missing("SUPABASE_URL"))));

        config.backend.supabase_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { key: "SUPABASE_URL", .. })));

        config.backend.supabase_url = "https://abc.supabase.co".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Missing("SUPABASE_ANON_KEY"))));

        config.backend.supabase_anon_key = "anon".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_backend_kind() {
        assert_eq!("memory".parse::<BackendKind>(), Ok(BackendKind::Memory));
        assert_eq!("Supabase".parse::<BackendKind>(), Ok(BackendKind::Supabase));
        assert!("postgres".parse::<BackendKind>().is_err());
    }
}
