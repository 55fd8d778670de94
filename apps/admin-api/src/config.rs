//! Admin API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//! Sync settings (remote backend, defaults, locks) live in the sync TOML file
//! whose path `CATALOG_SYNC_CONFIG` may point at.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Admin API configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminConfig {
    /// Interface to bind, e.g. `0.0.0.0`
    pub bind_addr: String,

    /// HTTP port
    pub port: u16,

    /// SQLite database file
    pub database_path: PathBuf,

    /// Sync config file; `None` uses the platform default location
    pub sync_config_path: Option<PathBuf>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        AdminConfig {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
            database_path: PathBuf::from("catalog.db"),
            sync_config_path: None,
        }
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match lookup("ADMIN_PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue("ADMIN_PORT".to_string()))?,
            None => defaults.port,
        };

        let config = AdminConfig {
            bind_addr: lookup("ADMIN_BIND_ADDR").unwrap_or(defaults.bind_addr),
            port,
            database_path: lookup("CATALOG_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            sync_config_path: lookup("CATALOG_SYNC_CONFIG").map(PathBuf::from),
        };

        config.socket_addr()?;
        Ok(config)
    }

    /// Address the HTTP server listens on.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue("ADMIN_BIND_ADDR".to_string()))
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
