// crates/batch-ledger-cli/src/logging.rs
// ============================================================================
// Module: CLI Logging
// Description: `tracing-subscriber` setup for the batch ledger CLI.
// Purpose: Route ledger events to stderr with a configurable filter and format.
// Dependencies: batch-ledger-config, thiserror, tracing-subscriber
// ============================================================================

//! ## Overview
//! `RUST_LOG` wins over the configured `logging.filter`. Events are written
//! to stderr so that command output on stdout stays machine-readable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;

use batch_ledger_config::LogFormat;
use batch_ledger_config::LoggingConfig;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable consulted before the configured filter.
pub const LOG_ENV_VAR: &str = "RUST_LOG";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Logging setup errors.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The filter directive could not be parsed.
    #[error("invalid log filter {directive}: {reason}")]
    InvalidFilter {
        /// Directive as written.
        directive: String,
        /// Parser message.
        reason: String,
    },
}

// ============================================================================
// SECTION: Setup
// ============================================================================

/// Returns the filter directive in effect: a non-blank `env_value`, else the
/// configured filter.
#[must_use]
pub fn filter_directive(env_value: Option<&str>, config: &LoggingConfig) -> String {
    env_value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| config.filter.trim())
        .to_string()
}

/// Builds the `EnvFilter` for `directive`.
///
/// # Errors
///
/// Returns [`LoggingError::InvalidFilter`] when the directive does not parse.
pub fn build_filter(directive: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(directive).map_err(|err| LoggingError::InvalidFilter {
        directive: directive.to_string(),
        reason: err.to_string(),
    })
}

/// Installs the global subscriber. Later calls in the same process are
/// no-ops.
///
/// # Errors
///
/// Returns [`LoggingError`] when the effective filter is invalid.
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let env_value = env::var(LOG_ENV_VAR).ok();
    let filter = build_filter(&filter_directive(env_value.as_deref(), config))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let _ = match config.format {
        LogFormat::Text => builder.with_target(true).try_init(),
        LogFormat::Json => builder
            .json()
            .with_timer(tracing_subscriber::fmt::time::SystemTime)
            .with_target(false)
            .try_init(),
    };
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        reason = "Test-only assertions and helpers are permitted."
    )]

    use super::*;

    #[test]
    fn environment_filter_wins_when_present() {
        let config = LoggingConfig::default();
        assert_eq!(filter_directive(Some("debug"), &config), "debug");
        assert_eq!(filter_directive(Some("  "), &config), "info");
        assert_eq!(filter_directive(None, &config), "info");
    }

    #[test]
    fn invalid_directive_is_reported() {
        let error = build_filter("batch_ledger_core=loud").unwrap_err();
        assert!(error.to_string().contains("batch_ledger_core=loud"));
        assert!(build_filter("warn,batch_ledger_store_sqlite=debug").is_ok());
    }
}
