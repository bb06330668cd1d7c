// crates/batch-ledger-config/src/config.rs
// ============================================================================
// Module: Batch Ledger Configuration
// Description: Configuration loading and validation for the batch ledger.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: batch-ledger-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The `[store]` table is the `SQLite` store configuration itself; the
//! optional `[logging]` table selects the log filter and output format.
//! Unknown keys and out-of-range values are rejected rather than ignored.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use batch_ledger_store_sqlite::SqliteStoreConfig;
use batch_ledger_store_sqlite::store::MAX_READ_POOL_SIZE;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "batch-ledger.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "BATCH_LEDGER_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum busy timeout in milliseconds.
pub(crate) const MAX_BUSY_TIMEOUT_MS: u64 = 600_000;
/// Maximum length of a log filter directive.
pub(crate) const MAX_LOG_FILTER_LENGTH: usize = 256;
/// Default log filter directive.
const DEFAULT_LOG_FILTER: &str = "info";

// ============================================================================
// SECTION: Config
// ============================================================================

/// Batch ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// `SQLite` ledger store settings.
    pub store: SqliteStoreConfig,
    /// Log filter and format.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl LedgerConfig {
    /// Returns a configuration for the ledger at `path` with default tuning.
    #[must_use]
    pub fn for_store_path(path: impl Into<PathBuf>) -> Self {
        Self {
            store: SqliteStoreConfig::new(path),
            logging: LoggingConfig::default(),
        }
    }

    /// Loads configuration from disk using the default resolution rules:
    /// an explicit path, then [`CONFIG_ENV_VAR`], then
    /// [`DEFAULT_CONFIG_NAME`] in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_store(&self.store)?;
        self.logging.validate()
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// Validates logging configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let filter = self.filter.trim();
        if filter.is_empty() {
            return Err(ConfigError::Invalid("logging.filter must be non-empty".to_string()));
        }
        if filter.len() > MAX_LOG_FILTER_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "logging.filter exceeds {MAX_LOG_FILTER_LENGTH} characters"
            )));
        }
        Ok(())
    }
}

/// Returns the default log filter.
fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates the `[store]` table.
fn validate_store(store: &SqliteStoreConfig) -> Result<(), ConfigError> {
    validate_path_string("store.path", &store.path.to_string_lossy())?;
    if !(1 ..= MAX_BUSY_TIMEOUT_MS).contains(&store.busy_timeout_ms) {
        return Err(ConfigError::Invalid(format!(
            "store.busy_timeout_ms must be between 1 and {MAX_BUSY_TIMEOUT_MS}"
        )));
    }
    if !(1 ..= MAX_READ_POOL_SIZE).contains(&store.read_pool_size) {
        return Err(ConfigError::Invalid(format!(
            "store.read_pool_size must be between 1 and {MAX_READ_POOL_SIZE}"
        )));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
