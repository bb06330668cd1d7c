// crates/batch-ledger-core/src/interfaces/mod.rs
// ============================================================================
// Module: Batch Ledger Interfaces
// Description: Backend-agnostic store contracts and the ledger error set.
// Purpose: Define the durable operations every ledger backend must provide.
// Dependencies: crate::model, thiserror
// ============================================================================

//! ## Overview
//! Stores implement three contracts: [`CheckpointStore`], [`StatusStore`],
//! and [`ExecutionHistoryStore`]; [`LedgerStore`] bundles them with a
//! readiness probe. Every operation is synchronous, independently scoped,
//! and either fully applied or not applied at all. Lookups that may
//! legitimately miss return `Ok(None)`; id lookups that the caller expects to
//! succeed fail with [`LedgerError::NoSuchExecution`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use thiserror::Error;

use crate::codec::CodecError;
use crate::model::BatchStatus;
use crate::model::CheckpointPair;
use crate::model::JobExecution;
use crate::model::JobExecutionId;
use crate::model::JobInstance;
use crate::model::JobInstanceId;
use crate::model::JobParameters;
use crate::model::JobStatus;
use crate::model::PartitionInstanceName;
use crate::model::PurgeSummary;
use crate::model::StepExecution;
use crate::model::StepExecutionId;
use crate::model::StepExecutionUpdate;
use crate::model::StepMetrics;
use crate::model::StepStatus;
use crate::model::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum step name length in bytes.
pub const MAX_STEP_NAME_BYTES: usize = 512;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Ledger operation errors.
///
/// # Invariants
/// - Messages name the entity and key involved, never payload bytes.
/// - The set is closed; backends map their own failures into it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Backing store could not be reached or failed mid-operation.
    #[error("ledger store unavailable: {0}")]
    StoreUnavailable(String),
    /// Keyed record does not exist.
    #[error("ledger record not found: {0}")]
    NotFound(String),
    /// Record already exists.
    #[error("ledger record already exists: {0}")]
    AlreadyExists(String),
    /// Stored blob is truncated or corrupt.
    #[error("ledger blob decode failure: {0}")]
    DecodeFailure(String),
    /// Id lookup missed where the caller expected a row.
    #[error("no such execution: {0}")]
    NoSuchExecution(String),
    /// Status change refused (for example leaving `ABANDONED`).
    #[error("ledger transition rejected: {0}")]
    InvalidTransition(String),
    /// Caller input rejected before touching the store.
    #[error("ledger request invalid: {0}")]
    Invalid(String),
}

impl LedgerError {
    /// Wraps a codec error with entity context.
    #[must_use]
    pub fn decode(context: &str, error: &CodecError) -> Self {
        Self::DecodeFailure(format!("{context}: {error}"))
    }
}

/// Rejects empty or oversized step names.
///
/// # Errors
///
/// Returns [`LedgerError::Invalid`] when the name is empty or longer than
/// [`MAX_STEP_NAME_BYTES`].
pub fn ensure_step_name(step_name: &str) -> Result<(), LedgerError> {
    if step_name.is_empty() {
        return Err(LedgerError::Invalid("step name must not be empty".to_string()));
    }
    if step_name.len() > MAX_STEP_NAME_BYTES {
        return Err(LedgerError::Invalid(format!(
            "step name exceeds {MAX_STEP_NAME_BYTES} bytes"
        )));
    }
    Ok(())
}

// ============================================================================
// SECTION: Checkpoint Store
// ============================================================================

/// Durable reader/writer checkpoint tokens.
pub trait CheckpointStore {
    /// Creates the reader and writer rows for a step with null tokens.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AlreadyExists`] when either row exists; no row
    /// is written in that case.
    fn create_checkpoint_pair(
        &self,
        job_instance_id: JobInstanceId,
        step_name: &str,
    ) -> Result<(), LedgerError>;

    /// Loads both tokens for a step.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the store fails or a token blob is corrupt.
    fn get_checkpoint_pair(
        &self,
        job_instance_id: JobInstanceId,
        step_name: &str,
    ) -> Result<Option<CheckpointPair>, LedgerError>;

    /// Overwrites both tokens for a step.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] when the pair was never created.
    fn update_checkpoint_pair(
        &self,
        job_instance_id: JobInstanceId,
        step_name: &str,
        pair: &CheckpointPair,
    ) -> Result<(), LedgerError>;
}

// ============================================================================
// SECTION: Status Store
// ============================================================================

/// Durable current-status projections.
pub trait StatusStore {
    /// Creates the status record for a job instance.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AlreadyExists`] when a record exists and
    /// [`LedgerError::NotFound`] when the instance does not.
    fn create_job_status(&self, job_instance_id: JobInstanceId) -> Result<JobStatus, LedgerError>;

    /// Loads the status record for a job instance.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the store fails or the blob is corrupt.
    fn get_job_status(&self, job_instance_id: JobInstanceId)
    -> Result<Option<JobStatus>, LedgerError>;

    /// Overwrites the status record keyed by `status.job_instance_id`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] when no record exists.
    fn update_job_status(&self, status: &JobStatus) -> Result<(), LedgerError>;

    /// Loads the job status of the instance owning an execution.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NoSuchExecution`] when the execution is unknown.
    fn get_job_status_for_execution(
        &self,
        job_execution_id: JobExecutionId,
    ) -> Result<Option<JobStatus>, LedgerError>;

    /// Creates the status record for the first entry into a step.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AlreadyExists`] when a record exists and
    /// [`LedgerError::NoSuchExecution`] when the step execution does not.
    fn create_step_status(
        &self,
        step_execution_id: StepExecutionId,
    ) -> Result<StepStatus, LedgerError>;

    /// Loads the status record for a step within a job instance.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the store fails or the blob is corrupt.
    fn get_step_status(
        &self,
        job_instance_id: JobInstanceId,
        step_name: &str,
    ) -> Result<Option<StepStatus>, LedgerError>;

    /// Overwrites the status record keyed by `status.status_id`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] when no record exists.
    fn update_step_status(&self, status: &StepStatus) -> Result<(), LedgerError>;

    /// Adds one to a step's start count atomically and returns the new count.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] when no record exists.
    fn increment_step_start_count(&self, status_id: StepExecutionId) -> Result<u32, LedgerError>;
}

// ============================================================================
// SECTION: Execution History Store
// ============================================================================

/// Durable job instances, job executions, and step executions.
pub trait ExecutionHistoryStore {
    /// Creates a job instance.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the store fails.
    fn create_job_instance(
        &self,
        name: &str,
        app_tag: &str,
        job_definition: Option<&str>,
    ) -> Result<JobInstance, LedgerError>;

    /// Creates a synthetic job instance hosting one partition.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the store fails.
    fn create_sub_job_instance(
        &self,
        name: &PartitionInstanceName,
        app_tag: &str,
    ) -> Result<JobInstance, LedgerError>;

    /// Loads a job instance.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the store fails.
    fn get_job_instance(
        &self,
        job_instance_id: JobInstanceId,
    ) -> Result<Option<JobInstance>, LedgerError>;

    /// Resolves the app tag of a job instance.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] when the instance does not exist.
    fn app_tag_for_instance(&self, job_instance_id: JobInstanceId) -> Result<String, LedgerError>;

    /// Counts job instances with a name, optionally restricted to an app tag.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the store fails.
    fn job_instance_count(&self, name: &str, app_tag: Option<&str>) -> Result<u64, LedgerError>;

    /// Pages job instance ids for a name, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the store fails.
    fn job_instance_ids(
        &self,
        name: &str,
        app_tag: Option<&str>,
        start: usize,
        count: usize,
    ) -> Result<Vec<JobInstanceId>, LedgerError>;

    /// Lists every non-partition job instance as `id -> name`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the store fails.
    fn external_job_instances(&self) -> Result<BTreeMap<JobInstanceId, String>, LedgerError>;

    /// Creates a job execution for an instance.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] when the instance does not exist.
    fn create_job_execution(
        &self,
        job_instance_id: JobInstanceId,
        parameters: &JobParameters,
        initial_status: BatchStatus,
        create_time: Timestamp,
    ) -> Result<JobExecutionId, LedgerError>;

    /// Marks an execution `STARTED` and records its start time.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NoSuchExecution`] when the execution is unknown.
    fn mark_job_started(
        &self,
        job_execution_id: JobExecutionId,
        start_time: Timestamp,
    ) -> Result<(), LedgerError>;

    /// Updates only the batch status and last-update time of an execution.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NoSuchExecution`] when the execution is unknown.
    fn update_batch_status_only(
        &self,
        job_execution_id: JobExecutionId,
        batch_status: BatchStatus,
        update_time: Timestamp,
    ) -> Result<(), LedgerError>;

    /// Records the final batch status, exit status, and end time.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NoSuchExecution`] when the execution is unknown.
    fn finalize_job_execution(
        &self,
        job_execution_id: JobExecutionId,
        batch_status: BatchStatus,
        exit_status: &str,
        end_time: Timestamp,
    ) -> Result<(), LedgerError>;

    /// Loads a job execution.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the store fails or parameters are corrupt.
    fn get_job_execution(
        &self,
        job_execution_id: JobExecutionId,
    ) -> Result<Option<JobExecution>, LedgerError>;

    /// Lists executions of an instance, highest id first.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the store fails.
    fn job_executions_for_instance(
        &self,
        job_instance_id: JobInstanceId,
    ) -> Result<Vec<JobExecution>, LedgerError>;

    /// Lists running execution ids (`STARTING`, `STARTED`, `STOPPING`) of a job name.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the store fails.
    fn running_execution_ids(&self, job_name: &str) -> Result<Vec<JobExecutionId>, LedgerError>;

    /// Resolves the job instance owning an execution.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NoSuchExecution`] when the execution is unknown.
    fn job_instance_id_for_execution(
        &self,
        job_execution_id: JobExecutionId,
    ) -> Result<JobInstanceId, LedgerError>;

    /// Loads the parameters of an execution.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NoSuchExecution`] when the execution is unknown.
    fn job_parameters(&self, job_execution_id: JobExecutionId)
    -> Result<JobParameters, LedgerError>;

    /// Resolves the app tag of the instance owning an execution.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NoSuchExecution`] when the execution is unknown.
    fn app_tag_for_execution(&self, job_execution_id: JobExecutionId)
    -> Result<String, LedgerError>;

    /// Returns the latest-created execution of an instance.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the store fails.
    fn most_recent_execution_id(
        &self,
        job_instance_id: JobInstanceId,
    ) -> Result<Option<JobExecutionId>, LedgerError>;

    /// Creates a step execution with status `STARTING`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NoSuchExecution`] when the job execution is unknown.
    fn create_step_execution(
        &self,
        job_execution_id: JobExecutionId,
        step_name: &str,
        initial_metrics: &StepMetrics,
        start_time: Timestamp,
    ) -> Result<StepExecutionId, LedgerError>;

    /// Applies an interval or end-of-step update to a step execution.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] when the step execution is unknown
    /// and [`LedgerError::InvalidTransition`] once the owning job execution
    /// has reached a terminal status.
    fn update_step_execution_metrics(
        &self,
        step_execution_id: StepExecutionId,
        update: &StepExecutionUpdate,
    ) -> Result<(), LedgerError>;

    /// Loads a step execution.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the store fails.
    fn get_step_execution(
        &self,
        step_execution_id: StepExecutionId,
    ) -> Result<Option<StepExecution>, LedgerError>;

    /// Lists the step executions of a job execution, lowest id first.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the store fails.
    fn step_executions_for_job_execution(
        &self,
        job_execution_id: JobExecutionId,
    ) -> Result<Vec<StepExecution>, LedgerError>;

    /// Lists the most recent step execution per step name for an instance.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the store fails.
    fn most_recent_step_executions(
        &self,
        job_instance_id: JobInstanceId,
    ) -> Result<Vec<StepExecution>, LedgerError>;

    /// Returns the metrics of every step execution hosted by a partition of
    /// `(root, step_name)`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the store fails.
    fn partition_step_metrics(
        &self,
        root: JobInstanceId,
        step_name: &str,
    ) -> Result<Vec<StepMetrics>, LedgerError>;

    /// Deletes every instance with an app tag along with all dependent rows.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the store fails; nothing is deleted then.
    fn purge(&self, app_tag: &str) -> Result<PurgeSummary, LedgerError>;
}

// ============================================================================
// SECTION: Ledger Store
// ============================================================================

/// Complete ledger backend.
pub trait LedgerStore: CheckpointStore + StatusStore + ExecutionHistoryStore {
    /// Verifies the backend can serve reads and writes.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::StoreUnavailable`] when the backend is unreachable.
    fn readiness(&self) -> Result<(), LedgerError>;
}
