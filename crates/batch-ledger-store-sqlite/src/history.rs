// crates/batch-ledger-store-sqlite/src/history.rs
// ============================================================================
// Module: SQLite Execution History Store
// Description: Job instances, job executions, and step executions.
// Purpose: Persist the append-mostly execution history and its queries.
// Dependencies: batch-ledger-core, rusqlite, tracing
// ============================================================================

//! ## Overview
//! History rows use `AUTOINCREMENT` keys, so ids are never reused, even after
//! a purge. Listings of job instances skip synthetic partition instances
//! (names starting with `:`). Partition lookups prefilter with an escaped
//! `LIKE` prefix and then confirm each name exactly, so step names holding
//! `%`, `_` or `:` never match a neighbor.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use batch_ledger_core::BatchStatus;
use batch_ledger_core::CheckpointKey;
use batch_ledger_core::ExecutionHistoryStore;
use batch_ledger_core::JobExecution;
use batch_ledger_core::JobExecutionId;
use batch_ledger_core::JobInstance;
use batch_ledger_core::JobInstanceId;
use batch_ledger_core::JobParameters;
use batch_ledger_core::LedgerError;
use batch_ledger_core::PartitionInstanceName;
use batch_ledger_core::PurgeSummary;
use batch_ledger_core::StepExecution;
use batch_ledger_core::StepExecutionId;
use batch_ledger_core::StepExecutionUpdate;
use batch_ledger_core::StepMetrics;
use batch_ledger_core::Timestamp;
use batch_ledger_core::ensure_step_name;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::ToSql;
use rusqlite::params;
use tracing::debug;
use tracing::info;

use crate::rows::JobExecutionRow;
use crate::rows::JobInstanceRow;
use crate::rows::SELECT_JOB_EXECUTION;
use crate::rows::SELECT_JOB_INSTANCE;
use crate::rows::SELECT_STEP_EXECUTION;
use crate::rows::StepExecutionRow;
use crate::rows::decode_parameters;
use crate::rows::encode_parameters;
use crate::rows::encode_token;
use crate::rows::metrics_from_columns;
use crate::rows::metrics_to_columns;
use crate::rows::parse_status;
use crate::rows::read_metrics;
use crate::store::SqliteLedgerStore;
use crate::store::SqliteStoreError;
use crate::store::db_error;
use crate::store::row_id;
use crate::store::sql_id;

// ============================================================================
// SECTION: Execution History Store
// ============================================================================

impl ExecutionHistoryStore for SqliteLedgerStore {
    fn create_job_instance(
        &self,
        name: &str,
        app_tag: &str,
        job_definition: Option<&str>,
    ) -> Result<JobInstance, LedgerError> {
        let instance = self.insert_instance(name, app_tag, job_definition)?;
        Ok(instance)
    }

    fn create_sub_job_instance(
        &self,
        name: &PartitionInstanceName,
        app_tag: &str,
    ) -> Result<JobInstance, LedgerError> {
        let instance = self.insert_instance(&name.to_string(), app_tag, None)?;
        Ok(instance)
    }

    fn get_job_instance(
        &self,
        job_instance_id: JobInstanceId,
    ) -> Result<Option<JobInstance>, LedgerError> {
        let key = sql_id(job_instance_id.get())?;
        let row = self.read(|connection| {
            connection
                .query_row(
                    &format!("{SELECT_JOB_INSTANCE} WHERE jobinstanceid = ?1"),
                    params![key],
                    JobInstanceRow::read,
                )
                .optional()
                .map_err(db_error("get job instance"))
        })?;
        Ok(row.map(JobInstanceRow::into_model).transpose()?)
    }

    fn app_tag_for_instance(&self, job_instance_id: JobInstanceId) -> Result<String, LedgerError> {
        let key = sql_id(job_instance_id.get())?;
        let tag = self.read(|connection| {
            connection
                .query_row(
                    "SELECT apptag FROM jobinstancedata WHERE jobinstanceid = ?1",
                    params![key],
                    |row| row.get::<_, String>(0),
                )
                .optional()
                .map_err(db_error("app tag for instance"))
        })?;
        tag.ok_or_else(|| LedgerError::NotFound(format!("job instance {job_instance_id}")))
    }

    fn job_instance_count(&self, name: &str, app_tag: Option<&str>) -> Result<u64, LedgerError> {
        let count = self.read(|connection| {
            connection
                .query_row(
                    "SELECT COUNT(*) FROM jobinstancedata
                     WHERE name = ?1 AND (?2 IS NULL OR apptag = ?2)",
                    params![name, app_tag],
                    |row| row.get::<_, i64>(0),
                )
                .map_err(db_error("job instance count"))
        })?;
        u64::try_from(count)
            .map_err(|_| LedgerError::DecodeFailure(format!("negative instance count: {count}")))
    }

    fn job_instance_ids(
        &self,
        name: &str,
        app_tag: Option<&str>,
        start: usize,
        count: usize,
    ) -> Result<Vec<JobInstanceId>, LedgerError> {
        let offset = i64::try_from(start).unwrap_or(i64::MAX);
        let limit = i64::try_from(count).unwrap_or(i64::MAX);
        let raw = self.read(|connection| {
            let mut stmt = connection
                .prepare(
                    "SELECT jobinstanceid FROM jobinstancedata
                     WHERE name = ?1 AND (?2 IS NULL OR apptag = ?2)
                     ORDER BY jobinstanceid DESC LIMIT ?3 OFFSET ?4",
                )
                .map_err(db_error("job instance ids"))?;
            stmt.query_map(params![name, app_tag, limit, offset], |row| row.get::<_, i64>(0))
                .map_err(db_error("job instance ids"))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(db_error("job instance ids"))
        })?;
        raw.into_iter()
            .map(|id| row_id(id).map(JobInstanceId::new).map_err(LedgerError::from))
            .collect()
    }

    fn external_job_instances(&self) -> Result<BTreeMap<JobInstanceId, String>, LedgerError> {
        let rows = self.read(|connection| {
            let mut stmt = connection
                .prepare(
                    "SELECT jobinstanceid, name FROM jobinstancedata
                     WHERE substr(name, 1, 1) <> ':'",
                )
                .map_err(db_error("external job instances"))?;
            stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))
                .map_err(db_error("external job instances"))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(db_error("external job instances"))
        })?;
        rows.into_iter()
            .map(|(id, name)| {
                row_id(id).map(|id| (JobInstanceId::new(id), name)).map_err(LedgerError::from)
            })
            .collect()
    }

    fn create_job_execution(
        &self,
        job_instance_id: JobInstanceId,
        parameters: &JobParameters,
        initial_status: BatchStatus,
        create_time: Timestamp,
    ) -> Result<JobExecutionId, LedgerError> {
        let instance = sql_id(job_instance_id.get())?;
        let blob = encode_parameters(parameters)?;
        let id = self.write("create job execution", |tx| {
            let exists: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM jobinstancedata WHERE jobinstanceid = ?1",
                    params![instance],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_error("create job execution"))?;
            if exists.is_none() {
                return Err(SqliteStoreError::Missing(format!("job instance {job_instance_id}")));
            }
            tx.execute(
                "INSERT INTO executioninstancedata
                    (jobinstanceid, createtime, updatetime, batchstatus, parameters)
                 VALUES (?1, ?2, ?2, ?3, ?4)",
                params![instance, create_time.as_unix_millis(), initial_status.as_str(), blob],
            )
            .map_err(db_error("create job execution"))?;
            row_id(tx.last_insert_rowid())
        })?;
        let id = JobExecutionId::new(id);
        debug!(
            job_instance_id = job_instance_id.get(),
            job_execution_id = id.get(),
            batch_status = initial_status.as_str(),
            "job execution created"
        );
        Ok(id)
    }

    fn mark_job_started(
        &self,
        job_execution_id: JobExecutionId,
        start_time: Timestamp,
    ) -> Result<(), LedgerError> {
        let millis = start_time.as_unix_millis();
        self.update_execution(
            "mark job started",
            job_execution_id,
            "UPDATE executioninstancedata
             SET batchstatus = 'STARTED', starttime = ?2, updatetime = ?2
             WHERE jobexecid = ?1",
            params![millis],
        )
    }

    fn update_batch_status_only(
        &self,
        job_execution_id: JobExecutionId,
        batch_status: BatchStatus,
        update_time: Timestamp,
    ) -> Result<(), LedgerError> {
        let millis = update_time.as_unix_millis();
        let status = batch_status.as_str();
        self.update_execution(
            "update batch status",
            job_execution_id,
            "UPDATE executioninstancedata SET batchstatus = ?2, updatetime = ?3 WHERE jobexecid = ?1",
            params![status, millis],
        )
    }

    fn finalize_job_execution(
        &self,
        job_execution_id: JobExecutionId,
        batch_status: BatchStatus,
        exit_status: &str,
        end_time: Timestamp,
    ) -> Result<(), LedgerError> {
        let millis = end_time.as_unix_millis();
        let status = batch_status.as_str();
        self.update_execution(
            "finalize job execution",
            job_execution_id,
            "UPDATE executioninstancedata
             SET batchstatus = ?2, exitstatus = ?3, endtime = ?4, updatetime = ?4
             WHERE jobexecid = ?1",
            params![status, exit_status, millis],
        )
    }

    fn get_job_execution(
        &self,
        job_execution_id: JobExecutionId,
    ) -> Result<Option<JobExecution>, LedgerError> {
        let key = sql_id(job_execution_id.get())?;
        let row = self.read(|connection| {
            connection
                .query_row(
                    &format!("{SELECT_JOB_EXECUTION} WHERE e.jobexecid = ?1"),
                    params![key],
                    JobExecutionRow::read,
                )
                .optional()
                .map_err(db_error("get job execution"))
        })?;
        Ok(row.map(JobExecutionRow::into_model).transpose()?)
    }

    fn job_executions_for_instance(
        &self,
        job_instance_id: JobInstanceId,
    ) -> Result<Vec<JobExecution>, LedgerError> {
        let key = sql_id(job_instance_id.get())?;
        let rows = self.read(|connection| {
            let mut stmt = connection
                .prepare(&format!(
                    "{SELECT_JOB_EXECUTION} WHERE e.jobinstanceid = ?1 ORDER BY e.jobexecid DESC"
                ))
                .map_err(db_error("job executions for instance"))?;
            stmt.query_map(params![key], JobExecutionRow::read)
                .map_err(db_error("job executions for instance"))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(db_error("job executions for instance"))
        })?;
        Ok(rows.into_iter().map(JobExecutionRow::into_model).collect::<Result<_, _>>()?)
    }

    fn running_execution_ids(&self, job_name: &str) -> Result<Vec<JobExecutionId>, LedgerError> {
        let raw = self.read(|connection| {
            let mut stmt = connection
                .prepare(
                    "SELECT e.jobexecid FROM executioninstancedata e
                     JOIN jobinstancedata i ON i.jobinstanceid = e.jobinstanceid
                     WHERE i.name = ?1 AND e.batchstatus IN ('STARTING', 'STARTED', 'STOPPING')
                     ORDER BY e.jobexecid ASC",
                )
                .map_err(db_error("running execution ids"))?;
            stmt.query_map(params![job_name], |row| row.get::<_, i64>(0))
                .map_err(db_error("running execution ids"))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(db_error("running execution ids"))
        })?;
        raw.into_iter()
            .map(|id| row_id(id).map(JobExecutionId::new).map_err(LedgerError::from))
            .collect()
    }

    fn job_instance_id_for_execution(
        &self,
        job_execution_id: JobExecutionId,
    ) -> Result<JobInstanceId, LedgerError> {
        let key = sql_id(job_execution_id.get())?;
        let raw = self.read(|connection| {
            connection
                .query_row(
                    "SELECT jobinstanceid FROM executioninstancedata WHERE jobexecid = ?1",
                    params![key],
                    |row| row.get::<_, i64>(0),
                )
                .optional()
                .map_err(db_error("job instance for execution"))
        })?;
        let raw = raw.ok_or_else(|| {
            LedgerError::NoSuchExecution(format!("job execution {job_execution_id}"))
        })?;
        Ok(JobInstanceId::new(row_id(raw)?))
    }

    fn job_parameters(
        &self,
        job_execution_id: JobExecutionId,
    ) -> Result<JobParameters, LedgerError> {
        let key = sql_id(job_execution_id.get())?;
        let blob = self.read(|connection| {
            connection
                .query_row(
                    "SELECT parameters FROM executioninstancedata WHERE jobexecid = ?1",
                    params![key],
                    |row| row.get::<_, Vec<u8>>(0),
                )
                .optional()
                .map_err(db_error("job parameters"))
        })?;
        let blob = blob.ok_or_else(|| {
            LedgerError::NoSuchExecution(format!("job execution {job_execution_id}"))
        })?;
        Ok(decode_parameters(&blob, &format!("job execution {job_execution_id}"))?)
    }

    fn app_tag_for_execution(
        &self,
        job_execution_id: JobExecutionId,
    ) -> Result<String, LedgerError> {
        let key = sql_id(job_execution_id.get())?;
        let tag = self.read(|connection| {
            connection
                .query_row(
                    "SELECT i.apptag FROM executioninstancedata e
                     JOIN jobinstancedata i ON i.jobinstanceid = e.jobinstanceid
                     WHERE e.jobexecid = ?1",
                    params![key],
                    |row| row.get::<_, String>(0),
                )
                .optional()
                .map_err(db_error("app tag for execution"))
        })?;
        tag.ok_or_else(|| LedgerError::NoSuchExecution(format!("job execution {job_execution_id}")))
    }

    fn most_recent_execution_id(
        &self,
        job_instance_id: JobInstanceId,
    ) -> Result<Option<JobExecutionId>, LedgerError> {
        let key = sql_id(job_instance_id.get())?;
        let raw = self.read(|connection| {
            connection
                .query_row(
                    "SELECT jobexecid FROM executioninstancedata WHERE jobinstanceid = ?1
                     ORDER BY createtime DESC, jobexecid DESC LIMIT 1",
                    params![key],
                    |row| row.get::<_, i64>(0),
                )
                .optional()
                .map_err(db_error("most recent execution"))
        })?;
        Ok(raw.map(|id| row_id(id).map(JobExecutionId::new)).transpose()?)
    }

    fn create_step_execution(
        &self,
        job_execution_id: JobExecutionId,
        step_name: &str,
        initial_metrics: &StepMetrics,
        start_time: Timestamp,
    ) -> Result<StepExecutionId, LedgerError> {
        ensure_step_name(step_name)?;
        let execution = sql_id(job_execution_id.get())?;
        let counts = metrics_to_columns(*initial_metrics)?;
        let null_data = encode_token(None)?;
        let id = self.write("create step execution", |tx| {
            let exists: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM executioninstancedata WHERE jobexecid = ?1",
                    params![execution],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_error("create step execution"))?;
            if exists.is_none() {
                return Err(SqliteStoreError::MissingExecution(format!(
                    "job execution {job_execution_id}"
                )));
            }
            tx.execute(
                "INSERT INTO stepexecutioninstancedata
                    (jobexecid, stepname, batchstatus, readcount, writecount, commitcount,
                     rollbackcount, readskipcount, processskipcount, filtercount, writeskipcount,
                     starttime, persistentdata)
                 VALUES (?1, ?2, 'STARTING', ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    execution,
                    step_name,
                    counts[0],
                    counts[1],
                    counts[2],
                    counts[3],
                    counts[4],
                    counts[5],
                    counts[6],
                    counts[7],
                    start_time.as_unix_millis(),
                    null_data
                ],
            )
            .map_err(db_error("create step execution"))?;
            row_id(tx.last_insert_rowid())
        })?;
        let id = StepExecutionId::new(id);
        debug!(
            job_execution_id = job_execution_id.get(),
            step_execution_id = id.get(),
            step_name,
            "step execution created"
        );
        Ok(id)
    }

    fn update_step_execution_metrics(
        &self,
        step_execution_id: StepExecutionId,
        update: &StepExecutionUpdate,
    ) -> Result<(), LedgerError> {
        let key = sql_id(step_execution_id.get())?;
        let counts = metrics_to_columns(update.metrics)?;
        let data = encode_token(update.persistent_user_data.as_deref())?;
        let end_time = update.end_time.map(Timestamp::as_unix_millis);
        let batch_status = update.batch_status.map(BatchStatus::as_str);
        self.write("update step execution", |tx| {
            let current = tx
                .query_row(
                    "SELECT e.jobexecid, e.batchstatus
                     FROM stepexecutioninstancedata s
                     JOIN executioninstancedata e ON e.jobexecid = s.jobexecid
                     WHERE s.stepexecid = ?1",
                    params![key],
                    |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
                )
                .optional()
                .map_err(db_error("update step execution"))?;
            let Some((owner, owner_status)) = current else {
                return Err(SqliteStoreError::Missing(format!(
                    "step execution {step_execution_id}"
                )));
            };
            let owner_status = parse_status(&owner_status)?;
            if owner_status.is_terminal() {
                return Err(SqliteStoreError::Rejected(format!(
                    "step execution {step_execution_id} belongs to job execution {owner} \
                     which is {owner_status}"
                )));
            }
            tx.execute(
                "UPDATE stepexecutioninstancedata SET
                    readcount = ?2, writecount = ?3, commitcount = ?4, rollbackcount = ?5,
                    readskipcount = ?6, processskipcount = ?7, filtercount = ?8,
                    writeskipcount = ?9, persistentdata = ?10,
                    endtime = COALESCE(?11, endtime),
                    batchstatus = COALESCE(?12, batchstatus),
                    exitstatus = COALESCE(?13, exitstatus)
                 WHERE stepexecid = ?1",
                params![
                    key,
                    counts[0],
                    counts[1],
                    counts[2],
                    counts[3],
                    counts[4],
                    counts[5],
                    counts[6],
                    counts[7],
                    data,
                    end_time,
                    batch_status,
                    update.exit_status
                ],
            )
            .map_err(db_error("update step execution"))?;
            Ok(())
        })?;
        debug!(
            step_execution_id = step_execution_id.get(),
            read_count = update.metrics.read_count,
            write_count = update.metrics.write_count,
            "step execution updated"
        );
        Ok(())
    }

    fn get_step_execution(
        &self,
        step_execution_id: StepExecutionId,
    ) -> Result<Option<StepExecution>, LedgerError> {
        let key = sql_id(step_execution_id.get())?;
        let row = self.read(|connection| {
            connection
                .query_row(
                    &format!("{SELECT_STEP_EXECUTION} WHERE s.stepexecid = ?1"),
                    params![key],
                    StepExecutionRow::read,
                )
                .optional()
                .map_err(db_error("get step execution"))
        })?;
        Ok(row.map(StepExecutionRow::into_model).transpose()?)
    }

    fn step_executions_for_job_execution(
        &self,
        job_execution_id: JobExecutionId,
    ) -> Result<Vec<StepExecution>, LedgerError> {
        let key = sql_id(job_execution_id.get())?;
        let rows = self.read(|connection| {
            query_steps(
                connection,
                &format!("{SELECT_STEP_EXECUTION} WHERE s.jobexecid = ?1 ORDER BY s.stepexecid ASC"),
                key,
            )
        })?;
        Ok(rows.into_iter().map(StepExecutionRow::into_model).collect::<Result<_, _>>()?)
    }

    fn most_recent_step_executions(
        &self,
        job_instance_id: JobInstanceId,
    ) -> Result<Vec<StepExecution>, LedgerError> {
        let key = sql_id(job_instance_id.get())?;
        let rows = self.read(|connection| {
            query_steps(
                connection,
                &format!(
                    "{SELECT_STEP_EXECUTION}
                     JOIN executioninstancedata e ON e.jobexecid = s.jobexecid
                     WHERE e.jobinstanceid = ?1 ORDER BY s.stepexecid DESC"
                ),
                key,
            )
        })?;
        let mut seen = BTreeSet::new();
        Ok(rows
            .into_iter()
            .filter(|row| seen.insert(row.step_name().to_string()))
            .map(StepExecutionRow::into_model)
            .collect::<Result<_, _>>()?)
    }

    fn partition_step_metrics(
        &self,
        root: JobInstanceId,
        step_name: &str,
    ) -> Result<Vec<StepMetrics>, LedgerError> {
        let pattern = PartitionInstanceName::like_pattern(root, step_name);
        let rows = self.read(|connection| {
            let mut stmt = connection
                .prepare(
                    "SELECT i.name, s.readcount, s.writecount, s.commitcount, s.rollbackcount,
                            s.readskipcount, s.processskipcount, s.filtercount, s.writeskipcount
                     FROM stepexecutioninstancedata s
                     JOIN executioninstancedata e ON e.jobexecid = s.jobexecid
                     JOIN jobinstancedata i ON i.jobinstanceid = e.jobinstanceid
                     WHERE i.name LIKE ?1 ESCAPE '\\'
                     ORDER BY s.stepexecid ASC",
                )
                .map_err(db_error("partition step metrics"))?;
            stmt.query_map(params![pattern], |row| {
                Ok((row.get::<_, String>(0)?, read_metrics(row, 1)?))
            })
            .map_err(db_error("partition step metrics"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_error("partition step metrics"))
        })?;
        let metrics = rows
            .into_iter()
            .filter(|(name, _)| PartitionInstanceName::belongs_to(name, root, step_name))
            .map(|(_, counts)| metrics_from_columns(counts))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(root = root.get(), step_name, rows = metrics.len(), "partition rows loaded");
        Ok(metrics)
    }

    fn purge(&self, app_tag: &str) -> Result<PurgeSummary, LedgerError> {
        let summary = self.write("purge", |tx| {
            let instances = {
                let mut stmt = tx
                    .prepare("SELECT jobinstanceid FROM jobinstancedata WHERE apptag = ?1")
                    .map_err(db_error("purge"))?;
                stmt.query_map(params![app_tag], |row| row.get::<_, i64>(0))
                    .map_err(db_error("purge"))?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(db_error("purge"))?
            };
            let step_statuses = tx
                .execute(
                    "DELETE FROM stepstatus WHERE id IN (
                        SELECT s.stepexecid FROM stepexecutioninstancedata s
                        JOIN executioninstancedata e ON e.jobexecid = s.jobexecid
                        JOIN jobinstancedata i ON i.jobinstanceid = e.jobinstanceid
                        WHERE i.apptag = ?1)",
                    params![app_tag],
                )
                .map_err(db_error("purge step statuses"))?;
            let step_executions = tx
                .execute(
                    "DELETE FROM stepexecutioninstancedata WHERE jobexecid IN (
                        SELECT e.jobexecid FROM executioninstancedata e
                        JOIN jobinstancedata i ON i.jobinstanceid = e.jobinstanceid
                        WHERE i.apptag = ?1)",
                    params![app_tag],
                )
                .map_err(db_error("purge step executions"))?;
            let job_statuses = tx
                .execute(
                    "DELETE FROM jobstatus WHERE id IN (
                        SELECT jobinstanceid FROM jobinstancedata WHERE apptag = ?1)",
                    params![app_tag],
                )
                .map_err(db_error("purge job statuses"))?;
            let mut checkpoints = 0;
            for instance in instances {
                let prefix = CheckpointKey::instance_prefix(JobInstanceId::new(row_id(instance)?));
                checkpoints += tx
                    .execute(
                        "DELETE FROM checkpointdata WHERE substr(id, 1, length(?1)) = ?1",
                        params![prefix],
                    )
                    .map_err(db_error("purge checkpoints"))?;
            }
            let job_executions = tx
                .execute(
                    "DELETE FROM executioninstancedata WHERE jobinstanceid IN (
                        SELECT jobinstanceid FROM jobinstancedata WHERE apptag = ?1)",
                    params![app_tag],
                )
                .map_err(db_error("purge job executions"))?;
            let job_instances = tx
                .execute("DELETE FROM jobinstancedata WHERE apptag = ?1", params![app_tag])
                .map_err(db_error("purge job instances"))?;
            Ok(PurgeSummary {
                job_instances,
                job_executions,
                step_executions,
                job_statuses,
                step_statuses,
                checkpoints,
            })
        })?;
        info!(
            app_tag,
            job_instances = summary.job_instances,
            job_executions = summary.job_executions,
            step_executions = summary.step_executions,
            checkpoints = summary.checkpoints,
            "ledger purged"
        );
        Ok(summary)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

impl SqliteLedgerStore {
    /// Inserts a job instance row.
    fn insert_instance(
        &self,
        name: &str,
        app_tag: &str,
        job_definition: Option<&str>,
    ) -> Result<JobInstance, SqliteStoreError> {
        let id = self.write("create job instance", |tx| {
            tx.execute(
                "INSERT INTO jobinstancedata (name, apptag, jobdefinition) VALUES (?1, ?2, ?3)",
                params![name, app_tag, job_definition],
            )
            .map_err(db_error("create job instance"))?;
            row_id(tx.last_insert_rowid())
        })?;
        let id = JobInstanceId::new(id);
        debug!(job_instance_id = id.get(), name, app_tag, "job instance created");
        Ok(JobInstance {
            id,
            name: name.to_string(),
            app_tag: app_tag.to_string(),
            job_definition: job_definition.map(str::to_string),
        })
    }

    /// Runs a single-row execution update, mapping zero changed rows to
    /// [`SqliteStoreError::MissingExecution`]. `?1` binds the execution id and
    /// `values` bind from `?2` on.
    fn update_execution(
        &self,
        context: &str,
        job_execution_id: JobExecutionId,
        sql: &str,
        values: &[&dyn ToSql],
    ) -> Result<(), LedgerError> {
        let key = sql_id(job_execution_id.get())?;
        let mut bound: Vec<&dyn ToSql> = Vec::with_capacity(values.len() + 1);
        bound.push(&key);
        bound.extend_from_slice(values);
        self.write(context, |tx| {
            let changed = tx.execute(sql, bound.as_slice()).map_err(db_error(context))?;
            if changed == 0 {
                return Err(SqliteStoreError::MissingExecution(format!(
                    "job execution {job_execution_id}"
                )));
            }
            Ok(())
        })?;
        debug!(job_execution_id = job_execution_id.get(), context, "job execution updated");
        Ok(())
    }
}

/// Runs a step execution query keyed by one integer.
fn query_steps(
    connection: &Connection,
    sql: &str,
    key: i64,
) -> Result<Vec<StepExecutionRow>, SqliteStoreError> {
    let mut stmt = connection.prepare(sql).map_err(db_error("step executions"))?;
    stmt.query_map(params![key], StepExecutionRow::read)
        .map_err(db_error("step executions"))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(db_error("step executions"))
}
