// crates/batch-ledger-store-sqlite/src/schema.rs
// ============================================================================
// Module: SQLite Ledger Schema
// Description: Table and index definitions for the ledger database.
// Purpose: Create missing schema objects idempotently on open.
// Dependencies: rusqlite, tracing
// ============================================================================

//! ## Overview
//! The ledger uses six tables plus a one-row `store_meta` version table.
//! Each table and index is looked up by name in `sqlite_master` and created
//! only when absent; nothing is ever dropped or altered. An existing
//! database written by a different schema version is refused.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::params;
use tracing::info;

use crate::store::SqliteStoreError;
use crate::store::db_error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
pub const SCHEMA_VERSION: i64 = 1;

/// Schema object kind as recorded in `sqlite_master`.
#[derive(Debug, Clone, Copy)]
enum ObjectKind {
    /// Table.
    Table,
    /// Index.
    Index,
}

impl ObjectKind {
    /// Returns the `sqlite_master.type` value.
    const fn label(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Index => "index",
        }
    }
}

/// Schema objects in creation order: parents before children.
const SCHEMA_OBJECTS: &[(ObjectKind, &str, &str)] = &[
    (
        ObjectKind::Table,
        "jobinstancedata",
        "CREATE TABLE jobinstancedata (
            jobinstanceid INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            apptag TEXT NOT NULL,
            jobdefinition TEXT
        )",
    ),
    (
        ObjectKind::Table,
        "executioninstancedata",
        "CREATE TABLE executioninstancedata (
            jobexecid INTEGER PRIMARY KEY AUTOINCREMENT,
            jobinstanceid INTEGER NOT NULL REFERENCES jobinstancedata (jobinstanceid),
            createtime INTEGER NOT NULL,
            starttime INTEGER,
            endtime INTEGER,
            updatetime INTEGER NOT NULL,
            batchstatus TEXT NOT NULL,
            exitstatus TEXT,
            parameters BLOB NOT NULL
        )",
    ),
    (
        ObjectKind::Table,
        "stepexecutioninstancedata",
        "CREATE TABLE stepexecutioninstancedata (
            stepexecid INTEGER PRIMARY KEY AUTOINCREMENT,
            jobexecid INTEGER NOT NULL REFERENCES executioninstancedata (jobexecid),
            stepname TEXT NOT NULL,
            batchstatus TEXT NOT NULL,
            exitstatus TEXT,
            readcount INTEGER NOT NULL,
            writecount INTEGER NOT NULL,
            commitcount INTEGER NOT NULL,
            rollbackcount INTEGER NOT NULL,
            readskipcount INTEGER NOT NULL,
            processskipcount INTEGER NOT NULL,
            filtercount INTEGER NOT NULL,
            writeskipcount INTEGER NOT NULL,
            starttime INTEGER NOT NULL,
            endtime INTEGER,
            persistentdata BLOB NOT NULL
        )",
    ),
    (
        ObjectKind::Table,
        "jobstatus",
        "CREATE TABLE jobstatus (
            id INTEGER PRIMARY KEY REFERENCES jobinstancedata (jobinstanceid),
            obj BLOB NOT NULL
        )",
    ),
    (
        ObjectKind::Table,
        "stepstatus",
        "CREATE TABLE stepstatus (
            id INTEGER PRIMARY KEY REFERENCES stepexecutioninstancedata (stepexecid),
            obj BLOB NOT NULL
        )",
    ),
    (
        ObjectKind::Table,
        "checkpointdata",
        "CREATE TABLE checkpointdata (
            id TEXT PRIMARY KEY,
            obj BLOB NOT NULL
        )",
    ),
    (
        ObjectKind::Index,
        "idx_jobinstancedata_name",
        "CREATE INDEX idx_jobinstancedata_name ON jobinstancedata (name)",
    ),
    (
        ObjectKind::Index,
        "idx_jobinstancedata_apptag",
        "CREATE INDEX idx_jobinstancedata_apptag ON jobinstancedata (apptag)",
    ),
    (
        ObjectKind::Index,
        "idx_executioninstancedata_jobinstanceid",
        "CREATE INDEX idx_executioninstancedata_jobinstanceid
            ON executioninstancedata (jobinstanceid)",
    ),
    (
        ObjectKind::Index,
        "idx_stepexecutioninstancedata_jobexecid",
        "CREATE INDEX idx_stepexecutioninstancedata_jobexecid
            ON stepexecutioninstancedata (jobexecid)",
    ),
];

// ============================================================================
// SECTION: Schema
// ============================================================================

/// Initializes the `SQLite` schema or validates the existing version.
pub(crate) fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(db_error("schema transaction"))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(db_error("schema meta"))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(db_error("schema version"))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(db_error("schema version"))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    for (kind, name, ddl) in SCHEMA_OBJECTS {
        if !schema_object_exists(&tx, *kind, name)? {
            tx.execute_batch(ddl).map_err(db_error(name))?;
            info!(kind = kind.label(), name = *name, "ledger schema object created");
        }
    }
    tx.commit().map_err(db_error("schema commit"))?;
    Ok(())
}

/// Returns true when a table or index with `name` exists.
fn schema_object_exists(
    tx: &Transaction<'_>,
    kind: ObjectKind,
    name: &str,
) -> Result<bool, SqliteStoreError> {
    let found: Option<i64> = tx
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = ?1 AND name = ?2",
            params![kind.label(), name],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_error("schema lookup"))?;
    Ok(found.is_some())
}
