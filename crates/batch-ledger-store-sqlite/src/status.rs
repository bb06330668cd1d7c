// crates/batch-ledger-store-sqlite/src/status.rs
// ============================================================================
// Module: SQLite Status Store
// Description: Job and step status records in `jobstatus` and `stepstatus`.
// Purpose: Persist current-status projections as framed JSON records.
// Dependencies: batch-ledger-core, rusqlite, tracing
// ============================================================================

//! ## Overview
//! A job status row is keyed by its job instance id. A step status row is
//! keyed by the step execution that first entered the step; lookups by
//! (instance, step name) resolve to the lowest such key.

// ============================================================================
// SECTION: Imports
// ============================================================================

use batch_ledger_core::JobExecutionId;
use batch_ledger_core::JobInstanceId;
use batch_ledger_core::JobStatus;
use batch_ledger_core::LedgerError;
use batch_ledger_core::StatusStore;
use batch_ledger_core::StepExecutionId;
use batch_ledger_core::StepStatus;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;
use tracing::debug;

use crate::rows::decode_record;
use crate::rows::encode_record;
use crate::store::SqliteLedgerStore;
use crate::store::SqliteStoreError;
use crate::store::db_error;
use crate::store::sql_id;

// ============================================================================
// SECTION: Status Store
// ============================================================================

impl StatusStore for SqliteLedgerStore {
    fn create_job_status(&self, job_instance_id: JobInstanceId) -> Result<JobStatus, LedgerError> {
        let key = sql_id(job_instance_id.get())?;
        let status = JobStatus::new(job_instance_id);
        let blob = encode_record(&status, "job status")?;
        self.write("create job status", |tx| {
            if !row_exists(tx, "SELECT 1 FROM jobinstancedata WHERE jobinstanceid = ?1", key)? {
                return Err(SqliteStoreError::Missing(format!("job instance {job_instance_id}")));
            }
            if row_exists(tx, "SELECT 1 FROM jobstatus WHERE id = ?1", key)? {
                return Err(SqliteStoreError::Conflict(format!("job status {job_instance_id}")));
            }
            tx.execute("INSERT INTO jobstatus (id, obj) VALUES (?1, ?2)", params![key, blob])
                .map_err(db_error("create job status"))?;
            Ok(())
        })?;
        debug!(job_instance_id = job_instance_id.get(), "job status stored");
        Ok(status)
    }

    fn get_job_status(
        &self,
        job_instance_id: JobInstanceId,
    ) -> Result<Option<JobStatus>, LedgerError> {
        let key = sql_id(job_instance_id.get())?;
        let status = self.read(|connection| load_job_status(connection, key))?;
        Ok(status)
    }

    fn update_job_status(&self, status: &JobStatus) -> Result<(), LedgerError> {
        let key = sql_id(status.job_instance_id.get())?;
        let blob = encode_record(status, "job status")?;
        self.write("update job status", |tx| {
            let changed = tx
                .execute("UPDATE jobstatus SET obj = ?2 WHERE id = ?1", params![key, blob])
                .map_err(db_error("update job status"))?;
            if changed == 0 {
                return Err(SqliteStoreError::Missing(format!(
                    "job status {}",
                    status.job_instance_id
                )));
            }
            Ok(())
        })?;
        Ok(())
    }

    fn get_job_status_for_execution(
        &self,
        job_execution_id: JobExecutionId,
    ) -> Result<Option<JobStatus>, LedgerError> {
        let execution = sql_id(job_execution_id.get())?;
        let status = self.read(|connection| {
            let instance: Option<i64> = connection
                .query_row(
                    "SELECT jobinstanceid FROM executioninstancedata WHERE jobexecid = ?1",
                    params![execution],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_error("job status for execution"))?;
            let Some(instance) = instance else {
                return Err(SqliteStoreError::MissingExecution(format!(
                    "job execution {job_execution_id}"
                )));
            };
            load_job_status(connection, instance)
        })?;
        Ok(status)
    }

    fn create_step_status(
        &self,
        step_execution_id: StepExecutionId,
    ) -> Result<StepStatus, LedgerError> {
        let key = sql_id(step_execution_id.get())?;
        let status = StepStatus::new(step_execution_id);
        let blob = encode_record(&status, "step status")?;
        self.write("create step status", |tx| {
            if !row_exists(tx, "SELECT 1 FROM stepexecutioninstancedata WHERE stepexecid = ?1", key)? {
                return Err(SqliteStoreError::MissingExecution(format!(
                    "step execution {step_execution_id}"
                )));
            }
            if row_exists(tx, "SELECT 1 FROM stepstatus WHERE id = ?1", key)? {
                return Err(SqliteStoreError::Conflict(format!("step status {step_execution_id}")));
            }
            tx.execute("INSERT INTO stepstatus (id, obj) VALUES (?1, ?2)", params![key, blob])
                .map_err(db_error("create step status"))?;
            Ok(())
        })?;
        debug!(step_execution_id = step_execution_id.get(), "step status stored");
        Ok(status)
    }

    fn get_step_status(
        &self,
        job_instance_id: JobInstanceId,
        step_name: &str,
    ) -> Result<Option<StepStatus>, LedgerError> {
        let instance = sql_id(job_instance_id.get())?;
        let row = self.read(|connection| {
            connection
                .query_row(
                    "SELECT id, obj FROM stepstatus WHERE id IN (
                        SELECT s.stepexecid FROM stepexecutioninstancedata s
                        JOIN executioninstancedata e ON e.jobexecid = s.jobexecid
                        WHERE e.jobinstanceid = ?1 AND s.stepname = ?2
                    ) ORDER BY id ASC LIMIT 1",
                    params![instance, step_name],
                    |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?)),
                )
                .optional()
                .map_err(db_error("get step status"))
        })?;
        let Some((key, blob)) = row else {
            return Ok(None);
        };
        Ok(Some(decode_step_status(key, &blob)?))
    }

    fn update_step_status(&self, status: &StepStatus) -> Result<(), LedgerError> {
        let key = sql_id(status.status_id.get())?;
        let blob = encode_record(status, "step status")?;
        self.write("update step status", |tx| {
            let changed = tx
                .execute("UPDATE stepstatus SET obj = ?2 WHERE id = ?1", params![key, blob])
                .map_err(db_error("update step status"))?;
            if changed == 0 {
                return Err(SqliteStoreError::Missing(format!("step status {}", status.status_id)));
            }
            Ok(())
        })?;
        Ok(())
    }

    fn increment_step_start_count(&self, status_id: StepExecutionId) -> Result<u32, LedgerError> {
        let key = sql_id(status_id.get())?;
        let count = self.write("increment step start count", |tx| {
            let blob: Option<Vec<u8>> = tx
                .query_row("SELECT obj FROM stepstatus WHERE id = ?1", params![key], |row| row.get(0))
                .optional()
                .map_err(db_error("increment step start count"))?;
            let Some(blob) = blob else {
                return Err(SqliteStoreError::Missing(format!("step status {status_id}")));
            };
            let mut status = decode_step_status(key, &blob)?;
            status.start_count = status.start_count.checked_add(1).ok_or_else(|| {
                SqliteStoreError::Invalid(format!("step status {status_id} start count overflow"))
            })?;
            let blob = encode_record(&status, "step status")?;
            tx.execute("UPDATE stepstatus SET obj = ?2 WHERE id = ?1", params![key, blob])
                .map_err(db_error("increment step start count"))?;
            Ok(status.start_count)
        })?;
        Ok(count)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns true when `sql` selects a row for `key`.
fn row_exists(connection: &Connection, sql: &str, key: i64) -> Result<bool, SqliteStoreError> {
    let found: Option<i64> = connection
        .query_row(sql, params![key], |row| row.get(0))
        .optional()
        .map_err(db_error("row lookup"))?;
    Ok(found.is_some())
}

/// Loads and decodes a job status row.
fn load_job_status(connection: &Connection, key: i64) -> Result<Option<JobStatus>, SqliteStoreError> {
    let blob: Option<Vec<u8>> = connection
        .query_row("SELECT obj FROM jobstatus WHERE id = ?1", params![key], |row| row.get(0))
        .optional()
        .map_err(db_error("get job status"))?;
    let Some(blob) = blob else {
        return Ok(None);
    };
    let status: JobStatus = decode_record(&blob, &format!("job status {key}"))?;
    if sql_id(status.job_instance_id.get())? != key {
        return Err(SqliteStoreError::Corrupt(format!(
            "job status {key} holds the record of instance {}",
            status.job_instance_id
        )));
    }
    Ok(Some(status))
}

/// Decodes a step status row and checks it against its key.
fn decode_step_status(key: i64, blob: &[u8]) -> Result<StepStatus, SqliteStoreError> {
    let status: StepStatus = decode_record(blob, &format!("step status {key}"))?;
    if sql_id(status.status_id.get())? != key {
        return Err(SqliteStoreError::Corrupt(format!(
            "step status {key} holds the record keyed {}",
            status.status_id
        )));
    }
    Ok(status)
}
