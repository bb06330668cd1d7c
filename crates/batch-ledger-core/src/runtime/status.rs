// crates/batch-ledger-core/src/runtime/status.rs
// ============================================================================
// Module: Batch Ledger Status Tracker
// Description: Job and step status transitions over a status store.
// Purpose: Apply read-modify-write transitions with the ABANDONED guard.
// Dependencies: crate::interfaces, crate::model, tracing
// ============================================================================

//! ## Overview
//! [`StatusTracker`] borrows a [`StatusStore`] handed in by the caller and
//! layers the named transitions on top of plain get/update. Transitions are
//! read-modify-write sequences and assume one active writer per job
//! instance; concurrent readers are safe. `ABANDONED` is terminal: any
//! transition that would move a job or step out of it fails with
//! [`LedgerError::InvalidTransition`] and leaves the stored record untouched.

// ============================================================================
// SECTION: Imports
// ============================================================================

use tracing::debug;
use tracing::warn;

use crate::interfaces::LedgerError;
use crate::interfaces::StatusStore;
use crate::interfaces::ensure_step_name;
use crate::model::BatchStatus;
use crate::model::JobExecutionId;
use crate::model::JobInstanceId;
use crate::model::JobStatus;
use crate::model::StepExecutionId;
use crate::model::StepStatus;

// ============================================================================
// SECTION: Status Tracker
// ============================================================================

/// Status transitions for job instances and steps.
///
/// # Invariants
/// - Never leaves `ABANDONED` once a record holds it.
/// - Holds no state of its own beyond the borrowed store.
#[derive(Debug)]
pub struct StatusTracker<'a, S: ?Sized> {
    /// Backing status store.
    store: &'a S,
}

impl<S: ?Sized> Clone for StatusTracker<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: ?Sized> Copy for StatusTracker<'_, S> {}

impl<'a, S: StatusStore + ?Sized> StatusTracker<'a, S> {
    /// Creates a tracker over `store`.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self {
            store,
        }
    }

    // ------------------------------------------------------------------------
    // Job side
    // ------------------------------------------------------------------------

    /// Creates the job status record with `batch_status = STARTING`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the record exists or the store fails.
    pub fn create_job_status(&self, job_instance_id: JobInstanceId) -> Result<JobStatus, LedgerError> {
        let status = self.store.create_job_status(job_instance_id)?;
        debug!(job_instance_id = job_instance_id.get(), "job status created");
        Ok(status)
    }

    /// Loads the job status record.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] when no record exists.
    pub fn get_job_status(&self, job_instance_id: JobInstanceId) -> Result<JobStatus, LedgerError> {
        self.store
            .get_job_status(job_instance_id)?
            .ok_or_else(|| LedgerError::NotFound(format!("job status {job_instance_id}")))
    }

    /// Loads the job status of the instance owning an execution.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NoSuchExecution`] when the execution is unknown
    /// and [`LedgerError::NotFound`] when the instance has no status record.
    pub fn get_job_status_for_execution(
        &self,
        job_execution_id: JobExecutionId,
    ) -> Result<JobStatus, LedgerError> {
        self.store.get_job_status_for_execution(job_execution_id)?.ok_or_else(|| {
            LedgerError::NotFound(format!("job status for execution {job_execution_id}"))
        })
    }

    /// Overwrites the job status record.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidTransition`] when the stored record is
    /// `ABANDONED` and the new one is not.
    pub fn update_job_status(&self, status: &JobStatus) -> Result<(), LedgerError> {
        let current = self.get_job_status(status.job_instance_id)?;
        self.write_job_status(&current, status.clone()).map(|_| ())
    }

    /// Sets the job batch status.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the record is missing or the transition
    /// leaves `ABANDONED`.
    pub fn set_batch_status(
        &self,
        job_instance_id: JobInstanceId,
        batch_status: BatchStatus,
    ) -> Result<JobStatus, LedgerError> {
        self.modify_job_status(job_instance_id, |status| status.batch_status = batch_status)
    }

    /// Sets the job batch and exit status together.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the record is missing or the transition
    /// leaves `ABANDONED`.
    pub fn set_execution_status(
        &self,
        job_instance_id: JobInstanceId,
        batch_status: BatchStatus,
        exit_status: &str,
    ) -> Result<JobStatus, LedgerError> {
        self.modify_job_status(job_instance_id, |status| {
            status.batch_status = batch_status;
            status.exit_status = Some(exit_status.to_string());
        })
    }

    /// Sets the job exit status.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the record is missing.
    pub fn set_exit_status(
        &self,
        job_instance_id: JobInstanceId,
        exit_status: &str,
    ) -> Result<JobStatus, LedgerError> {
        self.modify_job_status(job_instance_id, |status| {
            status.exit_status = Some(exit_status.to_string());
        })
    }

    /// Records the step the job is currently running.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the step name is invalid or the record is missing.
    pub fn set_current_step(
        &self,
        job_instance_id: JobInstanceId,
        step_name: &str,
    ) -> Result<JobStatus, LedgerError> {
        ensure_step_name(step_name)?;
        self.modify_job_status(job_instance_id, |status| {
            status.current_step = Some(step_name.to_string());
        })
    }

    /// Records (or clears) the step to resume at on the next restart.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the step name is invalid or the record is missing.
    pub fn set_restart_on(
        &self,
        job_instance_id: JobInstanceId,
        step_name: Option<&str>,
    ) -> Result<JobStatus, LedgerError> {
        if let Some(step_name) = step_name {
            ensure_step_name(step_name)?;
        }
        self.modify_job_status(job_instance_id, |status| {
            status.restart_on = step_name.map(str::to_string);
        })
    }

    /// Points the job at a new execution: clears `restart_on`, records the
    /// execution id, and resets the batch status to `STARTING`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the record is missing or is `ABANDONED`.
    pub fn advance_to_new_execution(
        &self,
        job_instance_id: JobInstanceId,
        job_execution_id: JobExecutionId,
    ) -> Result<JobStatus, LedgerError> {
        self.modify_job_status(job_instance_id, |status| {
            status.restart_on = None;
            status.latest_execution_id = Some(job_execution_id);
            status.batch_status = BatchStatus::Starting;
        })
    }

    /// Runs one read-modify-write cycle on a job status record.
    fn modify_job_status(
        &self,
        job_instance_id: JobInstanceId,
        change: impl FnOnce(&mut JobStatus),
    ) -> Result<JobStatus, LedgerError> {
        let current = self.get_job_status(job_instance_id)?;
        let mut next = current.clone();
        change(&mut next);
        self.write_job_status(&current, next)
    }

    /// Writes `next` after checking the transition from `current`.
    fn write_job_status(&self, current: &JobStatus, next: JobStatus) -> Result<JobStatus, LedgerError> {
        let context = format!("job status {}", current.job_instance_id);
        ensure_transition(&context, current.batch_status, next.batch_status)?;
        self.store.update_job_status(&next)?;
        debug!(
            job_instance_id = next.job_instance_id.get(),
            from = current.batch_status.as_str(),
            to = next.batch_status.as_str(),
            "job status updated"
        );
        Ok(next)
    }

    // ------------------------------------------------------------------------
    // Step side
    // ------------------------------------------------------------------------

    /// Creates the step status record for the first entry into a step.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the record exists or the step execution is unknown.
    pub fn create_step_status(
        &self,
        step_execution_id: StepExecutionId,
    ) -> Result<StepStatus, LedgerError> {
        let status = self.store.create_step_status(step_execution_id)?;
        debug!(step_execution_id = step_execution_id.get(), "step status created");
        Ok(status)
    }

    /// Loads the step status record for a step within a job instance.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] when no record exists.
    pub fn get_step_status(
        &self,
        job_instance_id: JobInstanceId,
        step_name: &str,
    ) -> Result<StepStatus, LedgerError> {
        ensure_step_name(step_name)?;
        self.store.get_step_status(job_instance_id, step_name)?.ok_or_else(|| {
            LedgerError::NotFound(format!("step status ({job_instance_id}, {step_name})"))
        })
    }

    /// Overwrites a step status record.
    ///
    /// The stored record is located through `status.status_id` and the
    /// `ABANDONED` guard is checked against it before writing.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the record is missing or the transition
    /// leaves `ABANDONED`.
    pub fn update_step_status(
        &self,
        job_instance_id: JobInstanceId,
        step_name: &str,
        status: &StepStatus,
    ) -> Result<(), LedgerError> {
        let current = self.get_step_status(job_instance_id, step_name)?;
        if current.status_id != status.status_id {
            return Err(LedgerError::Invalid(format!(
                "step status ({job_instance_id}, {step_name}) is keyed by {}, not {}",
                current.status_id, status.status_id
            )));
        }
        let context = format!("step status ({job_instance_id}, {step_name})");
        ensure_transition(&context, current.batch_status, status.batch_status)?;
        self.store.update_step_status(status)?;
        debug!(
            job_instance_id = job_instance_id.get(),
            step_name,
            step_execution_id = status.step_execution_id.get(),
            batch_status = status.batch_status.as_str(),
            "step status updated"
        );
        Ok(())
    }

    /// Records one (re)entry into a step and returns the new start count.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] when no record exists.
    pub fn increment_start_count(&self, status_id: StepExecutionId) -> Result<u32, LedgerError> {
        let count = self.store.increment_step_start_count(status_id)?;
        debug!(status_id = status_id.get(), start_count = count, "step start count incremented");
        Ok(count)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rejects transitions out of `ABANDONED`.
fn ensure_transition(context: &str, from: BatchStatus, to: BatchStatus) -> Result<(), LedgerError> {
    if from == BatchStatus::Abandoned && to != BatchStatus::Abandoned {
        warn!(context, to = to.as_str(), "rejected transition out of ABANDONED");
        return Err(LedgerError::InvalidTransition(format!(
            "{context}: ABANDONED cannot move to {to}"
        )));
    }
    Ok(())
}
