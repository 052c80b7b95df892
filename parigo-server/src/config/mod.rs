//! Configuration module for parigo-server.
//!
//! Handles loading configuration from a TOML file, CLI argument
//! overrides, and the `DATABASE_URL` environment variable.

pub mod file;
pub mod runtime;

use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;

use crate::config::file::FileConfig;
use crate::config::runtime::RuntimeConfig;
use parigo_core::processors::ReconcilerConfig;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// Reads the TOML file (a missing file means all defaults), applies
    /// CLI overrides, then validates.
    pub fn load(&self) -> Result<RuntimeConfig, ConfigError> {
        let mut file_config = match std::fs::read_to_string(&self.config_path) {
            Ok(content) => toml::from_str::<FileConfig>(&content)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = ?self.config_path, "no config file, using defaults");
                FileConfig {
                    server: Default::default(),
                    monitor: Default::default(),
                }
            }
            Err(err) => return Err(err.into()),
        };

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        Self::validate(&file_config)?;
        Ok(Self::build(file_config))
    }

    fn validate(config: &FileConfig) -> Result<(), ConfigError> {
        if config.monitor.poll_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "monitor.poll_interval_secs must be at least 1".into(),
            ));
        }
        if config.monitor.snapshot_ttl_minutes < config.monitor.recency_window_minutes {
            return Err(ConfigError::ValidationError(
                "monitor.snapshot_ttl_minutes must not be shorter than the recency window".into(),
            ));
        }
        if config.monitor.event_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "monitor.event_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }

    fn build(config: FileConfig) -> RuntimeConfig {
        RuntimeConfig {
            listen: config.server.listen,
            monitor: ReconcilerConfig {
                poll_interval: std::time::Duration::from_secs(config.monitor.poll_interval_secs),
                recency_window: time::Duration::minutes(
                    config.monitor.recency_window_minutes as i64,
                ),
                snapshot_ttl: time::Duration::minutes(config.monitor.snapshot_ttl_minutes as i64),
            },
            event_capacity: config.monitor.event_capacity,
        }
    }
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}
