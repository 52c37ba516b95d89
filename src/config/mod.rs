use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub storage: StorageBackend,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Versioned prefix every feature router is mounted under
    pub api_prefix: String,
    pub name: String,
    pub version: String,
    /// Public URL advertised as the production server in the API document
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    /// Apply sql/schema.sql at startup
    pub bootstrap_schema: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub idle_timeout_secs: u64,
}

/// Longest accepted idle timeout: ten years
const MAX_IDLE_TIMEOUT_SECS: u64 = 10 * 365 * 24 * 60 * 60;

impl SessionConfig {
    /// `secs` as a duration, if it is within the accepted range
    fn idle_duration(secs: u64) -> Option<chrono::Duration> {
        if secs > MAX_IDLE_TIMEOUT_SECS {
            return None;
        }
        i64::try_from(secs).ok().and_then(chrono::Duration::try_seconds)
    }

    /// Idle timeout; out-of-range values fall back to one hour
    pub fn idle_timeout(&self) -> chrono::Duration {
        Self::idle_duration(self.idle_timeout_secs).unwrap_or_else(|| chrono::Duration::hours(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors_origins: Vec<String>,
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
        if let Ok(v) = env::var("API_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("API_PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("API_PREFIX") {
            self.server.api_prefix = v;
        }
        if let Ok(v) = env::var("API_NAME") {
            self.server.name = v;
        }
        if let Ok(v) = env::var("API_VERSION") {
            self.server.version = v;
        }
        if let Ok(v) = env::var("API_BASE_URL") {
            self.server.base_url = v;
        }

        // Storage
        if let Ok(v) = env::var("STORAGE_BACKEND") {
            self.storage = match v.to_ascii_lowercase().as_str() {
                "memory" => StorageBackend::Memory,
                "postgres" | "postgresql" => StorageBackend::Postgres,
                _ => self.storage,
            };
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_BOOTSTRAP") {
            self.database.bootstrap_schema = v.parse().unwrap_or(self.database.bootstrap_schema);
        }

        // Session overrides
        if let Ok(v) = env::var("API_SESSION_COOKIE") {
            self.session.cookie_name = v;
        }
        if let Ok(v) = env::var("API_SESSION_IDLE_TIMEOUT") {
            self.session.idle_timeout_secs = v
                .parse()
                .ok()
                .filter(|secs| SessionConfig::idle_duration(*secs).is_some())
                .unwrap_or(self.session.idle_timeout_secs);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        self
    }

    fn server_defaults(base_url: &str) -> ServerConfig {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 6173,
            api_prefix: "/api/v1".to_string(),
            name: "One REST API".to_string(),
            version: "1.0.0".to_string(),
            base_url: base_url.to_string(),
        }
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: Self::server_defaults("http://localhost:6173"),
            storage: StorageBackend::Postgres,
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                bootstrap_schema: true,
            },
            session: SessionConfig {
                cookie_name: "one_session".to_string(),
                idle_timeout_secs: 60 * 60,
            },
            security: SecurityConfig {
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: Self::server_defaults("https://staging.example.com"),
            storage: StorageBackend::Postgres,
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
                bootstrap_schema: false,
            },
            session: SessionConfig {
                cookie_name: "one_session".to_string(),
                idle_timeout_secs: 60 * 60,
            },
            security: SecurityConfig {
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: Self::server_defaults("https://api.example.com"),
            storage: StorageBackend::Postgres,
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
                bootstrap_schema: false,
            },
            session: SessionConfig {
                cookie_name: "one_session".to_string(),
                idle_timeout_secs: 60 * 60,
            },
            security: SecurityConfig {
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
        assert_eq!(config.server.api_prefix, "/api/v1");
        assert_eq!(config.server.port, 6173);
        assert!(config.database.bootstrap_schema);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(!config.database.bootstrap_schema);
        assert_eq!(config.session.idle_timeout_secs, 3600);
        assert_eq!(config.storage, StorageBackend::Postgres);
    }

    #[test]
    fn out_of_range_idle_timeout_falls_back() {
        let mut session = AppConfig::development().session;
        assert_eq!(session.idle_timeout(), chrono::Duration::hours(1));

        session.idle_timeout_secs = 90;
        assert_eq!(session.idle_timeout(), chrono::Duration::seconds(90));

        for secs in [u64::MAX, i64::MAX as u64, MAX_IDLE_TIMEOUT_SECS + 1] {
            assert!(SessionConfig::idle_duration(secs).is_none());
            session.idle_timeout_secs = secs;
            assert_eq!(session.idle_timeout(), chrono::Duration::hours(1));
        }
    }
}
