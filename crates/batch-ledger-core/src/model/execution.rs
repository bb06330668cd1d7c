// crates/batch-ledger-core/src/model/execution.rs
// ============================================================================
// Module: Batch Ledger Execution Records
// Description: Job instances, job executions, step executions, and metrics.
// Purpose: Model the append-mostly execution history of a batch runtime.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`JobInstance`] is the durable identity of one submission. Each run
//! attempt is a [`JobExecution`], and each step run inside it is a
//! [`StepExecution`] carrying eight cumulative [`StepMetrics`] counters.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::model::identifiers::JobExecutionId;
use crate::model::identifiers::JobInstanceId;
use crate::model::identifiers::StepExecutionId;
use crate::model::status::BatchStatus;
use crate::model::time::Timestamp;

// ============================================================================
// SECTION: Job Instances
// ============================================================================

/// Durable identity of one logical job submission.
///
/// # Invariants
/// - `(name, app_tag)` need not be unique; `id` is the only stable identity.
/// - Synthetic partition instances carry a name starting with `:`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInstance {
    /// Store-assigned identifier.
    pub id: JobInstanceId,
    /// Job name.
    pub name: String,
    /// Application tag used for tenant filtering and purge.
    pub app_tag: String,
    /// Raw job definition text, when supplied.
    pub job_definition: Option<String>,
}

impl JobInstance {
    /// Returns true when the instance hosts a partition of another job.
    #[must_use]
    pub fn is_partition(&self) -> bool {
        self.name.starts_with(':')
    }
}

// ============================================================================
// SECTION: Job Parameters
// ============================================================================

/// Ordered key/value parameters supplied when a job execution is created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobParameters(BTreeMap<String, String>);

impl JobParameters {
    /// Creates an empty parameter set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Inserts a parameter, returning the previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Returns the value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when no parameters are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for JobParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(key, value)| (key.into(), value.into())).collect())
    }
}

// ============================================================================
// SECTION: Job Executions
// ============================================================================

/// One run attempt of a job instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobExecution {
    /// Store-assigned identifier.
    pub id: JobExecutionId,
    /// Owning job instance.
    pub job_instance_id: JobInstanceId,
    /// Name of the owning job instance.
    pub job_name: String,
    /// Creation time.
    pub create_time: Timestamp,
    /// Time the execution was marked started.
    pub start_time: Option<Timestamp>,
    /// Time the execution was finalized.
    pub end_time: Option<Timestamp>,
    /// Time of the last status or timestamp change.
    pub last_update_time: Timestamp,
    /// Current batch status.
    pub batch_status: BatchStatus,
    /// Exit status recorded at finalization.
    pub exit_status: Option<String>,
    /// Parameters supplied at creation.
    pub parameters: JobParameters,
}

// ============================================================================
// SECTION: Step Metrics
// ============================================================================

/// Cumulative counters for one step execution.
///
/// Each update replaces every counter; the ledger does not compare against
/// the stored values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepMetrics {
    /// Items read.
    pub read_count: u64,
    /// Items written.
    pub write_count: u64,
    /// Chunk commits.
    pub commit_count: u64,
    /// Chunk rollbacks.
    pub rollback_count: u64,
    /// Items skipped while reading.
    pub read_skip_count: u64,
    /// Items skipped while processing.
    pub process_skip_count: u64,
    /// Items filtered by the processor.
    pub filter_count: u64,
    /// Items skipped while writing.
    pub write_skip_count: u64,
}

impl StepMetrics {
    /// Returns the counters in declaration order.
    #[must_use]
    pub const fn to_array(self) -> [u64; 8] {
        [
            self.read_count,
            self.write_count,
            self.commit_count,
            self.rollback_count,
            self.read_skip_count,
            self.process_skip_count,
            self.filter_count,
            self.write_skip_count,
        ]
    }

    /// Builds metrics from counters in declaration order.
    #[must_use]
    pub const fn from_array(values: [u64; 8]) -> Self {
        Self {
            read_count: values[0],
            write_count: values[1],
            commit_count: values[2],
            rollback_count: values[3],
            read_skip_count: values[4],
            process_skip_count: values[5],
            filter_count: values[6],
            write_skip_count: values[7],
        }
    }

    /// Adds every counter independently, returning `None` on overflow.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        let left = self.to_array();
        let right = other.to_array();
        let mut sum = [0_u64; 8];
        for (slot, (a, b)) in sum.iter_mut().zip(left.into_iter().zip(right)) {
            *slot = a.checked_add(b)?;
        }
        Some(Self::from_array(sum))
    }
}

// ============================================================================
// SECTION: Step Executions
// ============================================================================

/// One run attempt of one step within a job execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepExecution {
    /// Store-assigned identifier.
    pub id: StepExecutionId,
    /// Owning job execution.
    pub job_execution_id: JobExecutionId,
    /// Step name.
    pub step_name: String,
    /// Current batch status.
    pub batch_status: BatchStatus,
    /// Exit status, once set.
    pub exit_status: Option<String>,
    /// Cumulative counters.
    pub metrics: StepMetrics,
    /// Step start time.
    pub start_time: Timestamp,
    /// Step end time, once known.
    pub end_time: Option<Timestamp>,
    /// Opaque user data persisted with the step.
    pub persistent_user_data: Option<Vec<u8>>,
}

/// Interval or end-of-step update applied to a step execution.
///
/// `None` for `batch_status`, `exit_status`, or `end_time` leaves the stored
/// value unchanged; `persistent_user_data` always overwrites.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepExecutionUpdate {
    /// New cumulative counters.
    pub metrics: StepMetrics,
    /// Opaque user data to store (absent clears it).
    pub persistent_user_data: Option<Vec<u8>>,
    /// End time to record.
    pub end_time: Option<Timestamp>,
    /// Batch status to record.
    pub batch_status: Option<BatchStatus>,
    /// Exit status to record.
    pub exit_status: Option<String>,
}

impl StepExecutionUpdate {
    /// Returns an update that only replaces the counters and user data.
    #[must_use]
    pub const fn metrics(metrics: StepMetrics, persistent_user_data: Option<Vec<u8>>) -> Self {
        Self {
            metrics,
            persistent_user_data,
            end_time: None,
            batch_status: None,
            exit_status: None,
        }
    }

    /// Sets the end time.
    #[must_use]
    pub fn with_end_time(mut self, end_time: Timestamp) -> Self {
        self.end_time = Some(end_time);
        self
    }

    /// Sets the batch and exit status.
    #[must_use]
    pub fn with_status(mut self, batch_status: BatchStatus, exit_status: impl Into<String>) -> Self {
        self.batch_status = Some(batch_status);
        self.exit_status = Some(exit_status.into());
        self
    }
}

// ============================================================================
// SECTION: Purge
// ============================================================================

/// Row counts removed by a purge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeSummary {
    /// Job instances removed.
    pub job_instances: usize,
    /// Job executions removed.
    pub job_executions: usize,
    /// Step executions removed.
    pub step_executions: usize,
    /// Job status records removed.
    pub job_statuses: usize,
    /// Step status records removed.
    pub step_statuses: usize,
    /// Checkpoint rows removed.
    pub checkpoints: usize,
}
