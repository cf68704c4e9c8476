//! Application configuration management.
//!
//! Configuration is layered with the `config` crate:
//!
//! 1. built-in defaults,
//! 2. an optional TOML file (`/etc/beacon/config.toml` on Linux),
//! 3. environment variables prefixed with `BEACON_`, using `__` between the
//!    section and the key (e.g. `BEACON_SERVER__PORT=8080`).
//!
//! ```toml
//! [bluetooth]
//! adapter = "hci0"
//!
//! [discovery]
//! event_capacity = 256
//! auto_start = true
//!
//! [server]
//! host = "0.0.0.0"
//! port = 3000
//!
//! [logging]
//! level = "info"
//! production = false
//! ```

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::DEFAULT_EVENT_CAPACITY;

/// Environment variable that overrides the configuration file location.
pub const CONFIG_PATH_ENV: &str = "BEACON_CONFIG";

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "BEACON";

static ADAPTER_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^hci\d+$").expect("adapter name pattern is valid"));

/// Errors from loading, saving or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required file does not exist.
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The layered sources could not be read or deserialized.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// The file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    WriteError {
        /// Target path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration could not be serialized to TOML.
    #[error("failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// One field holds an invalid value.
    #[error("invalid value for '{field}': {message}")]
    ValidationError {
        /// Dotted field path.
        field: &'static str,
        /// What is wrong.
        message: String,
    },

    /// Several fields hold invalid values.
    #[error("{} configuration errors", .0.len())]
    MultipleValidationErrors(Vec<ConfigError>),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Radio selection.
    pub bluetooth: BluetoothConfig,

    /// Discovery session tuning.
    pub discovery: DiscoveryConfig,

    /// HTTP listener.
    pub server: ServerConfig,

    /// Log output.
    pub logging: LoggingConfig,
}

/// Radio selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BluetoothConfig {
    /// Adapter to scan with (e.g. `hci0`). The system default when unset.
    pub adapter: Option<String>,
}

/// Discovery session tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Events buffered per subscriber before the oldest are dropped.
    pub event_capacity: usize,

    /// Start a fresh discovery as soon as the service is up.
    pub auto_start: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            event_capacity: DEFAULT_EVENT_CAPACITY,
            auto_start: true,
        }
    }
}

/// HTTP listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,

    /// Port to bind.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Log output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,

    /// JSON logs to rolling files plus compact stdout.
    pub production: bool,

    /// Directory for log files; platform default when unset.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            production: false,
            directory: None,
        }
    }
}

impl Config {
    /// Load configuration from `path` (which must exist) and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, cannot be parsed, or the
    /// result fails validation.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        Self::build(Some(path))
    }

    /// Load configuration from `path` if it exists, otherwise from defaults,
    /// then apply the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be parsed or the result
    /// fails validation.
    pub fn load_or_default(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        Self::build(path.exists().then_some(path))
    }

    fn build(path: Option<&Path>) -> ConfigResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }
        let config: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration as TOML, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let write_error = |source| ConfigError::WriteError {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(write_error)
    }

    /// Check every field, reporting all problems at once.
    ///
    /// # Errors
    ///
    /// Returns a single [`ConfigError::ValidationError`] or
    /// [`ConfigError::MultipleValidationErrors`].
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if let Some(adapter) = &self.bluetooth.adapter {
            if !is_valid_adapter_name(adapter) {
                errors.push(ConfigError::ValidationError {
                    field: "bluetooth.adapter",
                    message: format!("'{adapter}' is not an adapter name like 'hci0'"),
                });
            }
        }

        if self.discovery.event_capacity == 0 {
            errors.push(ConfigError::ValidationError {
                field: "discovery.event_capacity",
                message: "must be greater than zero".into(),
            });
        }

        if self.server.host.trim().is_empty() {
            errors.push(ConfigError::ValidationError {
                field: "server.host",
                message: "must not be empty".into(),
            });
        }

        if self.server.port == 0 {
            errors.push(ConfigError::ValidationError {
                field: "server.port",
                message: "must not be zero".into(),
            });
        }

        if self.logging.level.trim().is_empty() {
            errors.push(ConfigError::ValidationError {
                field: "logging.level",
                message: "must not be empty".into(),
            });
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }
}

/// Returns `true` for BlueZ adapter names such as `hci0`.
#[must_use]
pub fn is_valid_adapter_name(name: &str) -> bool {
    ADAPTER_NAME.is_match(name)
}

/// Default configuration file location.
///
/// `BEACON_CONFIG` wins; otherwise `/etc/beacon/config.toml` on Linux and the
/// platform config directory elsewhere.
#[must_use]
pub fn default_config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }

    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/etc/beacon/config.toml")
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "beacon").map_or_else(
            || PathBuf::from("config.toml"),
            |dirs| dirs.config_dir().join("config.toml"),
        )
    }
}
