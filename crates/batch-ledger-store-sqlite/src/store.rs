// crates/batch-ledger-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Ledger Store
// Description: Configuration, errors, and connection handling for the store.
// Purpose: Open the ledger database and scope every operation to one transaction.
// Dependencies: batch-ledger-core, rusqlite, serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! [`SqliteLedgerStore`] owns one write connection and a round-robin pool of
//! read connections to the same database file. Writes run inside an
//! `IMMEDIATE` transaction that is committed on success and rolled back on
//! every error path; a failed rollback is logged and never replaces the
//! error that caused it. Reads run directly on a pooled connection.
//!
//! The configured busy timeout is the only timeout surface: a connection
//! that cannot acquire the database lock within it fails with
//! [`SqliteStoreError::Busy`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::num::NonZeroU64;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use batch_ledger_core::LedgerError;
use batch_ledger_core::LedgerStore;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::Transaction;
use rusqlite::TransactionBehavior;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use tracing::warn;

use crate::schema::initialize_schema;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Default number of read connections.
const DEFAULT_READ_POOL_SIZE: usize = 4;
/// Maximum number of read connections.
pub const MAX_READ_POOL_SIZE: usize = 64;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` ledger store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Number of pooled read connections.
    #[serde(default = "default_read_pool_size")]
    pub read_pool_size: usize,
}

impl SqliteStoreConfig {
    /// Returns a configuration for `path` with default tuning.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            read_pool_size: DEFAULT_READ_POOL_SIZE,
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Returns the default read pool size.
const fn default_read_pool_size() -> usize {
    DEFAULT_READ_POOL_SIZE
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Lock not acquired within the busy timeout.
    #[error("sqlite store busy: {0}")]
    Busy(String),
    /// Stored row or blob failed to decode.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Request rejected before it reached the database.
    #[error("sqlite store invalid request: {0}")]
    Invalid(String),
    /// Record already exists.
    #[error("sqlite store conflict: {0}")]
    Conflict(String),
    /// Keyed record is missing.
    #[error("sqlite store record missing: {0}")]
    Missing(String),
    /// Execution id is unknown.
    #[error("sqlite store execution missing: {0}")]
    MissingExecution(String),
    /// Change refused by a ledger rule.
    #[error("sqlite store change rejected: {0}")]
    Rejected(String),
}

impl From<SqliteStoreError> for LedgerError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message)
            | SqliteStoreError::Db(message)
            | SqliteStoreError::Busy(message)
            | SqliteStoreError::VersionMismatch(message) => Self::StoreUnavailable(message),
            SqliteStoreError::Corrupt(message) => Self::DecodeFailure(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::Conflict(message) => Self::AlreadyExists(message),
            SqliteStoreError::Missing(message) => Self::NotFound(message),
            SqliteStoreError::MissingExecution(message) => Self::NoSuchExecution(message),
            SqliteStoreError::Rejected(message) => Self::InvalidTransition(message),
        }
    }
}

impl From<LedgerError> for SqliteStoreError {
    fn from(error: LedgerError) -> Self {
        match error {
            LedgerError::StoreUnavailable(message) => Self::Db(message),
            LedgerError::NotFound(message) => Self::Missing(message),
            LedgerError::AlreadyExists(message) => Self::Conflict(message),
            LedgerError::DecodeFailure(message) => Self::Corrupt(message),
            LedgerError::NoSuchExecution(message) => Self::MissingExecution(message),
            LedgerError::InvalidTransition(message) => Self::Rejected(message),
            LedgerError::Invalid(message) => Self::Invalid(message),
        }
    }
}

/// Returns a mapper that wraps `rusqlite` errors with operation context.
pub(crate) fn db_error(context: &str) -> impl Fn(rusqlite::Error) -> SqliteStoreError + '_ {
    move |err| match err.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => {
            SqliteStoreError::Busy(format!("{context}: {err}"))
        }
        _ => SqliteStoreError::Db(format!("{context}: {err}")),
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed ledger store.
#[derive(Debug, Clone)]
pub struct SqliteLedgerStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Dedicated write connection.
    write_connection: Arc<Mutex<Connection>>,
    /// Read connection pool.
    read_connections: Arc<Vec<Mutex<Connection>>>,
    /// Round-robin cursor for read connection selection.
    read_cursor: Arc<AtomicUsize>,
}

impl SqliteLedgerStore {
    /// Opens an `SQLite`-backed ledger store, creating missing tables.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_read_pool_size(config.read_pool_size)?;
        prepare_store_path(&config.path)?;
        let mut write_connection = open_writer(&config)?;
        initialize_schema(&mut write_connection)?;
        let mut read_connections = Vec::with_capacity(config.read_pool_size);
        for _ in 0 .. config.read_pool_size {
            read_connections.push(Mutex::new(open_reader(&config)?));
        }
        debug!(
            path = %config.path.display(),
            read_pool_size = config.read_pool_size,
            journal_mode = config.journal_mode.pragma_value(),
            "sqlite ledger store opened"
        );
        Ok(Self {
            config,
            write_connection: Arc::new(Mutex::new(write_connection)),
            read_connections: Arc::new(read_connections),
            read_cursor: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    /// Runs `operation` inside one `IMMEDIATE` write transaction.
    ///
    /// The transaction commits when `operation` succeeds and rolls back
    /// otherwise. A rollback failure is logged; the operation's own error is
    /// the one returned.
    pub(crate) fn write<T>(
        &self,
        context: &str,
        operation: impl FnOnce(&Transaction<'_>) -> Result<T, SqliteStoreError>,
    ) -> Result<T, SqliteStoreError> {
        let mut guard = self
            .write_connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite write mutex poisoned".to_string()))?;
        let tx = guard
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_error(context))?;
        match operation(&tx) {
            Ok(value) => {
                tx.commit().map_err(db_error(context))?;
                Ok(value)
            }
            Err(error) => {
                if let Err(rollback) = tx.rollback() {
                    warn!(context, error = %rollback, "sqlite rollback failed");
                }
                Err(error)
            }
        }
    }

    /// Runs `operation` on the next pooled read connection.
    pub(crate) fn read<T>(
        &self,
        operation: impl FnOnce(&Connection) -> Result<T, SqliteStoreError>,
    ) -> Result<T, SqliteStoreError> {
        let guard = self
            .read_connection()
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite read mutex poisoned".to_string()))?;
        operation(&guard)
    }

    /// Returns the next read connection using round-robin selection.
    fn read_connection(&self) -> &Mutex<Connection> {
        let len = self.read_connections.len();
        let index = self.read_cursor.fetch_add(1, Ordering::Relaxed) % len;
        &self.read_connections[index]
    }

    /// Verifies a read connection and the write connection answer a query.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] if a mutex is poisoned or the query fails.
    fn check_connection(&self) -> Result<(), SqliteStoreError> {
        self.read(|connection| select_one(connection, "readiness read"))?;
        let guard = self
            .write_connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite write mutex poisoned".to_string()))?;
        select_one(&guard, "readiness write")
    }
}

impl LedgerStore for SqliteLedgerStore {
    fn readiness(&self) -> Result<(), LedgerError> {
        self.check_connection().map_err(LedgerError::from)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rejects a directory path and creates the missing parent directories.
///
/// Length limits are enforced by the config layer before the store opens.
fn prepare_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(format!(
            "store path {} is a directory",
            path.display()
        )));
    }
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .map_err(|err| SqliteStoreError::Io(format!("{}: {err}", parent.display()))),
        _ => Ok(()),
    }
}

/// Validates the read pool size.
fn validate_read_pool_size(size: usize) -> Result<(), SqliteStoreError> {
    if size == 0 || size > MAX_READ_POOL_SIZE {
        return Err(SqliteStoreError::Invalid(format!(
            "read_pool_size must be between 1 and {MAX_READ_POOL_SIZE}"
        )));
    }
    Ok(())
}

/// Opens the write connection: busy timeout, foreign keys, journal and sync mode.
fn open_writer(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let connection = Connection::open(&config.path).map_err(db_error("open ledger"))?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(db_error("set busy timeout"))?;
    connection.pragma_update(None, "foreign_keys", true).map_err(db_error("enable foreign keys"))?;
    let requested = config.journal_mode.pragma_value();
    let applied: String = connection
        .pragma_update_and_check(None, "journal_mode", requested, |row| row.get(0))
        .map_err(db_error("set journal mode"))?;
    if !applied.eq_ignore_ascii_case(requested) {
        warn!(requested, applied = %applied, "sqlite kept a different journal mode");
    }
    connection
        .pragma_update(None, "synchronous", config.sync_mode.pragma_value())
        .map_err(db_error("set sync mode"))?;
    Ok(connection)
}

/// Opens a pooled read connection that refuses writes.
fn open_reader(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let connection = Connection::open(&config.path).map_err(db_error("open ledger reader"))?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(db_error("set busy timeout"))?;
    connection.pragma_update(None, "query_only", true).map_err(db_error("set query only"))?;
    Ok(connection)
}

/// Runs a trivial query.
fn select_one(connection: &Connection, context: &str) -> Result<(), SqliteStoreError> {
    connection.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)).map_err(db_error(context))?;
    Ok(())
}

/// Converts a ledger id into an `SQLite` integer key.
pub(crate) fn sql_id(id: u64) -> Result<i64, SqliteStoreError> {
    i64::try_from(id).map_err(|_| SqliteStoreError::Invalid(format!("id {id} exceeds sqlite range")))
}

/// Converts an `SQLite` integer key into a ledger id.
pub(crate) fn row_id(raw: i64) -> Result<NonZeroU64, SqliteStoreError> {
    u64::try_from(raw)
        .ok()
        .and_then(NonZeroU64::new)
        .ok_or_else(|| SqliteStoreError::Corrupt(format!("invalid row id: {raw}")))
}
