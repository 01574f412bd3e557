//! Configuration management for the versus server.
//!
//! This module handles loading, validation, and conversion of server configuration
//! from TOML files and command-line arguments.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;
use versus_server::config::{DEFAULT_PORT, DEFAULT_PROTOCOL_VERSION};
use versus_server::ServerConfig;

/// Log levels accepted by [`AppConfig::validate`].
const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application configuration loaded from TOML file.
///
/// This is the main configuration structure that encompasses the server
/// settings and the logging setup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration settings
    pub server: ServerSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Server-specific configuration settings.
///
/// Controls network binding, the handshake version and per-connection limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Network address to bind the server to (e.g., "0.0.0.0:49569")
    pub bind_address: String,
    /// Version token clients must send in their handshake
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,
    /// Maximum number of concurrent client connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Socket read buffer size in bytes
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
    /// Fixed base seed for reproducible sessions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rng_seed: Option<u64>,
}

fn default_protocol_version() -> String {
    DEFAULT_PROTOCOL_VERSION.to_string()
}

fn default_max_connections() -> usize {
    1000
}

fn default_read_buffer_size() -> usize {
    4096
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: format!("0.0.0.0:{DEFAULT_PORT}"),
            protocol_version: default_protocol_version(),
            max_connections: default_max_connections(),
            read_buffer_size: default_read_buffer_size(),
            rng_seed: None,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at the specified path
    /// and returns the default configuration.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The loaded or default configuration, or an error if loading/creation failed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Converts the application configuration to a server core configuration.
    pub fn to_server_config(&self) -> Result<ServerConfig, Box<dyn std::error::Error>> {
        Ok(ServerConfig {
            bind_address: self.server.bind_address.parse()?,
            protocol_version: self.server.protocol_version.clone(),
            max_connections: self.server.max_connections,
            read_buffer_size: self.server.read_buffer_size,
            rng_seed: self.server.rng_seed,
        })
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!("Invalid bind address: {}", &self.server.bind_address));
        }

        let version = &self.server.protocol_version;
        if version.len() != 3 || !version.is_ascii() {
            return Err(format!(
                "Protocol version must be exactly 3 ASCII characters, got {version:?}"
            ));
        }

        // One full pair at minimum
        if self.server.max_connections < 2 {
            return Err(format!(
                "max_connections must be at least 2, got {}",
                self.server.max_connections
            ));
        }

        if self.server.read_buffer_size == 0 {
            return Err("read_buffer_size must be greater than zero".to_string());
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {VALID_LOG_LEVELS:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}
