//! Application configuration module
//!
//! Configuration is read from environment variables (and a `.env` file in
//! development) with the `RENTAL_CHAT` prefix; nested values are separated by
//! a double underscore.
//!
//! ```no_run
//! use rental_chat::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod chat;
mod database;
mod error;
mod redis;
mod server;

pub use chat::ChatConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use redis::RedisConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Chat store (PostgreSQL)
    pub database: DatabaseConfig,

    /// Unread counter store (Redis)
    pub redis: RedisConfig,

    /// Live delivery and paging tuning
    #[serde(default)]
    pub chat: ChatConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// - `RENTAL_CHAT__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `RENTAL_CHAT__DATABASE__URL=...` -> `database.url = ...`
    /// - `RENTAL_CHAT__CHAT__PUSH_BUFFER=128` -> `chat.push_buffer = 128`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or cannot be
    /// parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("RENTAL_CHAT")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.redis.validate()?;
        self.chat.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "RENTAL_CHAT__DATABASE__URL",
        "RENTAL_CHAT__REDIS__URL",
        "RENTAL_CHAT__SERVER__PORT",
        "RENTAL_CHAT__SERVER__ENVIRONMENT",
        "RENTAL_CHAT__CHAT__PUSH_BUFFER",
    ];

    fn set_minimal_env() {
        env::set_var("RENTAL_CHAT__DATABASE__URL", "postgresql://test@localhost/test");
        env::set_var("RENTAL_CHAT__REDIS__URL", "redis://localhost:6379");
    }

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.expect("config should load");
        assert_eq!(config.database.url, "postgresql://test@localhost/test");
        assert_eq!(config.redis.url, "redis://localhost:6379");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_for_optional_sections() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
        assert_eq!(config.chat.push_buffer, 64);
        assert_eq!(config.chat.default_page_size, 20);
    }

    #[test]
    fn test_nested_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("RENTAL_CHAT__SERVER__PORT", "3000");
        env::set_var("RENTAL_CHAT__SERVER__ENVIRONMENT", "production");
        env::set_var("RENTAL_CHAT__CHAT__PUSH_BUFFER", "128");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
        assert!(config.is_production());
        assert_eq!(config.chat.push_buffer, 128);
    }

    #[test]
    fn test_missing_database_section_fails() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        env::set_var("RENTAL_CHAT__REDIS__URL", "redis://localhost:6379");
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_err());
    }
}
