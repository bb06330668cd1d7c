// crates/batch-ledger-core/src/model/status.rs
// ============================================================================
// Module: Batch Ledger Status Records
// Description: Batch status values and the current-state projections.
// Purpose: Hold the single overwrite-in-place status record per job and step.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`JobStatus`] and [`StepStatus`] are the current-state projections the
//! driver consults for restart decisions. There is exactly one record type per
//! projection: a freshly created record and one read back from a store differ
//! only in which optional fields are populated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::model::identifiers::JobExecutionId;
use crate::model::identifiers::JobInstanceId;
use crate::model::identifiers::StepExecutionId;

// ============================================================================
// SECTION: Batch Status
// ============================================================================

/// Lifecycle state of a job or step.
///
/// # Invariants
/// - [`BatchStatus::as_str`] and [`BatchStatus::from_str`] are exact inverses.
/// - `ABANDONED` is sticky: status holders refuse to leave it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    /// Created, not yet running.
    Starting,
    /// Running.
    Started,
    /// Stop requested, still winding down.
    Stopping,
    /// Stopped before completion.
    Stopped,
    /// Ended with a failure.
    Failed,
    /// Ended successfully.
    Completed,
    /// Abandoned by an operator; never restarted.
    Abandoned,
}

impl BatchStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Starting,
        Self::Started,
        Self::Stopping,
        Self::Stopped,
        Self::Failed,
        Self::Completed,
        Self::Abandoned,
    ];

    /// Returns the canonical upper-case label stored in status columns.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "STARTING",
            Self::Started => "STARTED",
            Self::Stopping => "STOPPING",
            Self::Stopped => "STOPPED",
            Self::Failed => "FAILED",
            Self::Completed => "COMPLETED",
            Self::Abandoned => "ABANDONED",
        }
    }

    /// Returns true for the statuses a running execution reports.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Starting | Self::Started | Self::Stopping)
    }

    /// Returns true once an execution can no longer change.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Failed | Self::Completed | Self::Abandoned)
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| format!("unknown batch status: {value}"))
    }
}

// ============================================================================
// SECTION: Job Status
// ============================================================================

/// Current-state projection for one job instance.
///
/// # Invariants
/// - Created once per job instance with `batch_status = STARTING` and no other
///   field set.
/// - Every transition overwrites the whole record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    /// Owning job instance.
    pub job_instance_id: JobInstanceId,
    /// Name of the step currently running.
    pub current_step: Option<String>,
    /// Current batch status.
    pub batch_status: BatchStatus,
    /// Current exit status.
    pub exit_status: Option<String>,
    /// Most recent execution of the instance.
    pub latest_execution_id: Option<JobExecutionId>,
    /// Step to resume at on the next restart.
    pub restart_on: Option<String>,
}

impl JobStatus {
    /// Returns a fresh status for a newly created job instance.
    #[must_use]
    pub const fn new(job_instance_id: JobInstanceId) -> Self {
        Self {
            job_instance_id,
            current_step: None,
            batch_status: BatchStatus::Starting,
            exit_status: None,
            latest_execution_id: None,
            restart_on: None,
        }
    }
}

// ============================================================================
// SECTION: Step Status
// ============================================================================

/// Current-state projection for one step within a job instance.
///
/// # Invariants
/// - `status_id` is the step execution that first entered the step; it keys
///   the stored record and never changes.
/// - `step_execution_id` tracks the current execution across restarts.
/// - `start_count` grows by exactly one per (re)entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepStatus {
    /// Step execution the record was created under (storage key).
    pub status_id: StepExecutionId,
    /// Current step execution.
    pub step_execution_id: StepExecutionId,
    /// Previous run's step execution, kept for restart continuity.
    pub last_run_step_execution_id: Option<StepExecutionId>,
    /// Current batch status.
    pub batch_status: BatchStatus,
    /// Current exit status.
    pub exit_status: Option<String>,
    /// Number of times the step has been entered.
    pub start_count: u32,
    /// Opaque user data carried between runs.
    pub persistent_user_data: Option<Vec<u8>>,
    /// Partition count for partitioned steps.
    pub num_partitions: Option<u32>,
}

impl StepStatus {
    /// Returns a fresh status for the first entry into a step.
    #[must_use]
    pub const fn new(step_execution_id: StepExecutionId) -> Self {
        Self {
            status_id: step_execution_id,
            step_execution_id,
            last_run_step_execution_id: None,
            batch_status: BatchStatus::Starting,
            exit_status: None,
            start_count: 0,
            persistent_user_data: None,
            num_partitions: None,
        }
    }
}
