// crates/batch-ledger-store-sqlite/src/rows.rs
// ============================================================================
// Module: SQLite Ledger Rows
// Description: Raw row shapes and blob column encoding.
// Purpose: Convert between SQLite columns and ledger model records.
// Dependencies: batch-ledger-core, rusqlite
// ============================================================================

//! ## Overview
//! Rows are read into plain column structs first and converted into model
//! records afterwards, so a malformed value surfaces as
//! [`SqliteStoreError::Corrupt`] instead of being coerced. Every blob column
//! is framed; status records and job parameters are JSON inside the frame.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::str::FromStr;

use batch_ledger_core::BatchStatus;
use batch_ledger_core::JobExecution;
use batch_ledger_core::JobExecutionId;
use batch_ledger_core::JobInstance;
use batch_ledger_core::JobInstanceId;
use batch_ledger_core::JobParameters;
use batch_ledger_core::JsonCodec;
use batch_ledger_core::StepExecution;
use batch_ledger_core::StepExecutionId;
use batch_ledger_core::StepMetrics;
use batch_ledger_core::Timestamp;
use batch_ledger_core::codec::decode_frame;
use batch_ledger_core::codec::decode_value;
use batch_ledger_core::codec::encode_frame;
use batch_ledger_core::codec::encode_value;
use rusqlite::Row;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::store::SqliteStoreError;
use crate::store::row_id;

// ============================================================================
// SECTION: Column Lists
// ============================================================================

/// Job instance select list.
pub(crate) const SELECT_JOB_INSTANCE: &str =
    "SELECT jobinstanceid, name, apptag, jobdefinition FROM jobinstancedata";

/// Job execution select list joined with the owning instance name.
pub(crate) const SELECT_JOB_EXECUTION: &str = "SELECT e.jobexecid, e.jobinstanceid, i.name, \
     e.createtime, e.starttime, e.endtime, e.updatetime, e.batchstatus, e.exitstatus, \
     e.parameters FROM executioninstancedata e \
     JOIN jobinstancedata i ON i.jobinstanceid = e.jobinstanceid";

/// Step execution select list.
pub(crate) const SELECT_STEP_EXECUTION: &str = "SELECT s.stepexecid, s.jobexecid, s.stepname, \
     s.batchstatus, s.exitstatus, s.readcount, s.writecount, s.commitcount, s.rollbackcount, \
     s.readskipcount, s.processskipcount, s.filtercount, s.writeskipcount, s.starttime, \
     s.endtime, s.persistentdata FROM stepexecutioninstancedata s";

// ============================================================================
// SECTION: Job Instances
// ============================================================================

/// Raw `jobinstancedata` row.
pub(crate) struct JobInstanceRow {
    /// `jobinstanceid`.
    id: i64,
    /// `name`.
    name: String,
    /// `apptag`.
    app_tag: String,
    /// `jobdefinition`.
    job_definition: Option<String>,
}

impl JobInstanceRow {
    /// Reads a row selected with [`SELECT_JOB_INSTANCE`].
    pub(crate) fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            app_tag: row.get(2)?,
            job_definition: row.get(3)?,
        })
    }

    /// Converts into a model record.
    pub(crate) fn into_model(self) -> Result<JobInstance, SqliteStoreError> {
        Ok(JobInstance {
            id: JobInstanceId::new(row_id(self.id)?),
            name: self.name,
            app_tag: self.app_tag,
            job_definition: self.job_definition,
        })
    }
}

// ============================================================================
// SECTION: Job Executions
// ============================================================================

/// Raw `executioninstancedata` row with the instance name.
pub(crate) struct JobExecutionRow {
    /// `jobexecid`.
    id: i64,
    /// `jobinstanceid`.
    job_instance_id: i64,
    /// Owning instance `name`.
    job_name: String,
    /// `createtime`.
    create_time: i64,
    /// `starttime`.
    start_time: Option<i64>,
    /// `endtime`.
    end_time: Option<i64>,
    /// `updatetime`.
    update_time: i64,
    /// `batchstatus`.
    batch_status: String,
    /// `exitstatus`.
    exit_status: Option<String>,
    /// `parameters`.
    parameters: Vec<u8>,
}

impl JobExecutionRow {
    /// Reads a row selected with [`SELECT_JOB_EXECUTION`].
    pub(crate) fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            job_instance_id: row.get(1)?,
            job_name: row.get(2)?,
            create_time: row.get(3)?,
            start_time: row.get(4)?,
            end_time: row.get(5)?,
            update_time: row.get(6)?,
            batch_status: row.get(7)?,
            exit_status: row.get(8)?,
            parameters: row.get(9)?,
        })
    }

    /// Converts into a model record.
    pub(crate) fn into_model(self) -> Result<JobExecution, SqliteStoreError> {
        let id = JobExecutionId::new(row_id(self.id)?);
        let parameters = decode_parameters(&self.parameters, &format!("job execution {id}"))?;
        Ok(JobExecution {
            id,
            job_instance_id: JobInstanceId::new(row_id(self.job_instance_id)?),
            job_name: self.job_name,
            create_time: Timestamp::from_unix_millis(self.create_time),
            start_time: self.start_time.map(Timestamp::from_unix_millis),
            end_time: self.end_time.map(Timestamp::from_unix_millis),
            last_update_time: Timestamp::from_unix_millis(self.update_time),
            batch_status: parse_status(&self.batch_status)?,
            exit_status: self.exit_status,
            parameters,
        })
    }
}

// ============================================================================
// SECTION: Step Executions
// ============================================================================

/// Raw `stepexecutioninstancedata` row.
pub(crate) struct StepExecutionRow {
    /// `stepexecid`.
    id: i64,
    /// `jobexecid`.
    job_execution_id: i64,
    /// `stepname`.
    step_name: String,
    /// `batchstatus`.
    batch_status: String,
    /// `exitstatus`.
    exit_status: Option<String>,
    /// The eight counter columns in declaration order.
    metrics: [i64; 8],
    /// `starttime`.
    start_time: i64,
    /// `endtime`.
    end_time: Option<i64>,
    /// `persistentdata`.
    persistent_data: Vec<u8>,
}

impl StepExecutionRow {
    /// Reads a row selected with [`SELECT_STEP_EXECUTION`].
    pub(crate) fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            job_execution_id: row.get(1)?,
            step_name: row.get(2)?,
            batch_status: row.get(3)?,
            exit_status: row.get(4)?,
            metrics: read_metrics(row, 5)?,
            start_time: row.get(13)?,
            end_time: row.get(14)?,
            persistent_data: row.get(15)?,
        })
    }

    /// Returns the step name.
    pub(crate) fn step_name(&self) -> &str {
        &self.step_name
    }

    /// Converts into a model record.
    pub(crate) fn into_model(self) -> Result<StepExecution, SqliteStoreError> {
        let id = StepExecutionId::new(row_id(self.id)?);
        let persistent_user_data = decode_frame(&self.persistent_data).map_err(|err| {
            SqliteStoreError::Corrupt(format!("step execution {id} persistent data: {err}"))
        })?;
        Ok(StepExecution {
            id,
            job_execution_id: JobExecutionId::new(row_id(self.job_execution_id)?),
            step_name: self.step_name,
            batch_status: parse_status(&self.batch_status)?,
            exit_status: self.exit_status,
            metrics: metrics_from_columns(self.metrics)?,
            start_time: Timestamp::from_unix_millis(self.start_time),
            end_time: self.end_time.map(Timestamp::from_unix_millis),
            persistent_user_data,
        })
    }
}

/// Reads eight counter columns starting at `first`.
pub(crate) fn read_metrics(row: &Row<'_>, first: usize) -> rusqlite::Result<[i64; 8]> {
    let mut values = [0_i64; 8];
    for (offset, slot) in values.iter_mut().enumerate() {
        *slot = row.get(first + offset)?;
    }
    Ok(values)
}

/// Converts counter columns into metrics.
pub(crate) fn metrics_from_columns(values: [i64; 8]) -> Result<StepMetrics, SqliteStoreError> {
    let mut counters = [0_u64; 8];
    for (slot, value) in counters.iter_mut().zip(values) {
        *slot = u64::try_from(value)
            .map_err(|_| SqliteStoreError::Corrupt(format!("negative step counter: {value}")))?;
    }
    Ok(StepMetrics::from_array(counters))
}

/// Converts metrics into counter columns.
pub(crate) fn metrics_to_columns(metrics: StepMetrics) -> Result<[i64; 8], SqliteStoreError> {
    let mut values = [0_i64; 8];
    for (slot, value) in values.iter_mut().zip(metrics.to_array()) {
        *slot = i64::try_from(value).map_err(|_| {
            SqliteStoreError::Invalid(format!("step counter {value} exceeds sqlite range"))
        })?;
    }
    Ok(values)
}

// ============================================================================
// SECTION: Blob Columns
// ============================================================================

/// Parses a stored batch status label.
pub(crate) fn parse_status(label: &str) -> Result<BatchStatus, SqliteStoreError> {
    BatchStatus::from_str(label).map_err(SqliteStoreError::Corrupt)
}

/// Frames job parameters.
pub(crate) fn encode_parameters(parameters: &JobParameters) -> Result<Vec<u8>, SqliteStoreError> {
    encode_record(parameters, "job parameters")
}

/// Decodes framed job parameters.
pub(crate) fn decode_parameters(
    bytes: &[u8],
    context: &str,
) -> Result<JobParameters, SqliteStoreError> {
    decode_record(bytes, &format!("{context} parameters"))
}

/// Frames an optional opaque token.
pub(crate) fn encode_token(token: Option<&[u8]>) -> Result<Vec<u8>, SqliteStoreError> {
    encode_frame(token).map_err(|err| SqliteStoreError::Invalid(err.to_string()))
}

/// Decodes a framed optional opaque token.
pub(crate) fn decode_token(bytes: &[u8], context: &str) -> Result<Option<Vec<u8>>, SqliteStoreError> {
    decode_frame(bytes).map_err(|err| SqliteStoreError::Corrupt(format!("{context}: {err}")))
}

/// Frames a JSON record.
pub(crate) fn encode_record<T: Serialize + DeserializeOwned>(
    record: &T,
    context: &str,
) -> Result<Vec<u8>, SqliteStoreError> {
    encode_value(&JsonCodec::<T>::new(), record)
        .map_err(|err| SqliteStoreError::Invalid(format!("{context}: {err}")))
}

/// Decodes a framed JSON record.
pub(crate) fn decode_record<T: Serialize + DeserializeOwned>(
    bytes: &[u8],
    context: &str,
) -> Result<T, SqliteStoreError> {
    decode_value(&JsonCodec::<T>::new(), bytes)
        .map_err(|err| SqliteStoreError::Corrupt(format!("{context}: {err}")))
}
