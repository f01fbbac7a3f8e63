//! Configuration management module.
//!
//! Supports loading configuration from:
//! - TOML files (config/default.toml, config/{profile}.toml)
//! - Environment variables with `SEQUENCING_WORKER__<SECTION>__<KEY>` pattern
//! - A `.env` file in the working directory, if present

mod engine;
mod server;
mod storage;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub use engine::EngineConfig;
pub use server::ServerConfig;
pub use storage::{FileStorageConfig, PostgresStorageConfig, StorageBackend, StorageConfig};

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend configuration.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Sequence engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from files and environment.
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. `config/default.toml`
    /// 2. `config/{SEQUENCING_PROFILE}.toml` (if `SEQUENCING_PROFILE` is set)
    /// 3. Environment variables with `SEQUENCING_WORKER__` prefix
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();

        // Determine profile
        let profile =
            std::env::var("SEQUENCING_PROFILE").unwrap_or_else(|_| "development".to_string());

        // Build configuration
        let config = Config::builder()
            // Load default configuration
            .add_source(File::with_name("config/default").required(false))
            // Load profile-specific configuration
            .add_source(File::with_name(&format!("config/{profile}")).required(false))
            // Override with environment variables
            // SEQUENCING_WORKER__SERVER__PORT=8080 -> server.port = 8080
            .add_source(
                Environment::with_prefix("SEQUENCING_WORKER")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("auth.client_tokens")
                    .try_parsing(true),
            )
            .build()?;

        // Deserialize and validate
        let app_config: Self = config.try_deserialize()?;
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate server config
        if self.server.port == 0 {
            return Err(ConfigError::Message("server.port cannot be 0".to_string()));
        }

        // Validate storage config
        self.storage.validate()?;

        // Validate engine config
        self.engine.validate()?;

        if self.auth.admin_token.is_empty() {
            return Err(ConfigError::Message(
                "auth.admin_token cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Bearer token for configuration and administrative APIs.
    #[serde(default = "default_admin_token")]
    pub admin_token: String,

    /// Bearer tokens allowed to generate and preview.
    #[serde(default)]
    pub client_tokens: Vec<String>,
}

fn default_admin_token() -> String {
    "admin_change_me_in_production".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_token: default_admin_token(),
            client_tokens: Vec::new(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format: "text" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Install the Prometheus recorder and serve `/metrics`.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

const fn default_metrics_enabled() -> bool {
    true
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.engine.lock_timeout_ms, 5000);
        assert!(config.auth.client_tokens.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.auth.admin_token = String::new();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.engine.default_padding = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_from_toml() {
        let config: AppConfig = Config::builder()
            .add_source(config::File::from_str(
                r#"
                [server]
                port = 9090

                [engine]
                lazy_create = true
                lock_timeout_ms = 250

                [auth]
                admin_token = "secret"
                client_tokens = ["a", "b"]
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 9090);
        assert!(config.engine.lazy_create);
        assert_eq!(config.engine.lock_timeout_ms, 250);
        assert_eq!(config.auth.client_tokens, vec!["a", "b"]);
        assert_eq!(config.storage.backend, StorageBackend::File);
    }
}
