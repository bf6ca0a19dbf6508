//! # Configuration Management
//!
//! Centralized configuration for the package index server.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Environment variables via `from_env()`
//! - Direct instantiation with defaults
//!
//! Every section has defaults, so an empty TOML document is a valid config.

use crate::core::codec::DEFAULT_MAX_LINE_LENGTH;
use crate::error::{IndexerError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::Level;

/// Default listen address
pub const DEFAULT_ADDRESS: &str = "0.0.0.0:8080";

/// Default capacity of the shared error-reporting channel
pub const DEFAULT_ERROR_BACKLOG: usize = 32;

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct IndexerConfig {
    /// Server-specific configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl IndexerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| IndexerError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| IndexerError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| IndexerError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Override fields from `PACKAGE_INDEXER_*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(addr) = std::env::var("PACKAGE_INDEXER_ADDRESS") {
            self.server.address = addr;
        }

        if let Ok(backlog) = std::env::var("PACKAGE_INDEXER_ERROR_BACKLOG") {
            self.server.error_backlog = backlog.parse::<usize>().map_err(|e| {
                IndexerError::ConfigError(format!("Invalid PACKAGE_INDEXER_ERROR_BACKLOG: {e}"))
            })?;
        }

        if let Ok(len) = std::env::var("PACKAGE_INDEXER_MAX_LINE_LENGTH") {
            self.server.max_line_length = len.parse::<usize>().map_err(|e| {
                IndexerError::ConfigError(format!("Invalid PACKAGE_INDEXER_MAX_LINE_LENGTH: {e}"))
            })?;
        }

        if let Ok(level) = std::env::var("PACKAGE_INDEXER_LOG_LEVEL") {
            self.logging.log_level = Level::from_str(&level).map_err(|_| {
                IndexerError::ConfigError(format!("Invalid PACKAGE_INDEXER_LOG_LEVEL: {level}"))
            })?;
        }

        Ok(())
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = self.server.validate();
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(IndexerError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Server-specific configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (e.g., "0.0.0.0:8080")
    pub address: String,

    /// Capacity of the channel connection tasks report errors through
    pub error_backlog: usize,

    /// Longest accepted request line in bytes, terminator excluded
    pub max_line_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: String::from(DEFAULT_ADDRESS),
            error_backlog: DEFAULT_ERROR_BACKLOG,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl ServerConfig {
    /// Validate server configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("Server address cannot be empty".to_string());
        } else if self.address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!(
                "Invalid server address format: '{}' (expected format: '0.0.0.0:8080')",
                self.address
            ));
        }

        if self.error_backlog == 0 {
            errors.push("Error backlog must be greater than 0".to_string());
        } else if self.error_backlog > 1_000_000 {
            errors.push(format!(
                "Error backlog too large: {} (max recommended: 1,000,000)",
                self.error_backlog
            ));
        }

        // Shortest valid request is "QUERY|x|"
        if self.max_line_length < 8 {
            errors.push("Max line length too small (minimum: 8 bytes)".to_string());
        } else if self.max_line_length > 16 * 1024 * 1024 {
            errors.push(format!(
                "Max line length too large: {} bytes (maximum: 16 MB)",
                self.max_line_length
            ));
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to log to console
    pub log_to_console: bool,

    /// Whether to log to file
    pub log_to_file: bool,

    /// Path to log file (if log_to_file is true)
    pub log_file_path: Option<String>,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("package-indexer"),
            log_level: Level::INFO,
            log_to_console: true,
            log_to_file: false,
            log_file_path: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        if self.log_to_file {
            if let Some(ref path) = self.log_file_path {
                if let Some(parent) = Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        errors.push(format!(
                            "Log file directory does not exist: {}",
                            parent.display()
                        ));
                    }
                }
            } else {
                errors.push("log_file_path must be specified when log_to_file is true".to_string());
            }
        }

        if !self.log_to_console && !self.log_to_file {
            errors
                .push("At least one logging output (console or file) must be enabled".to_string());
        }

        errors
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
