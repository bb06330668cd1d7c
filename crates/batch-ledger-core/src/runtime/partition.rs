// crates/batch-ledger-core/src/runtime/partition.rs
// ============================================================================
// Module: Batch Ledger Partition Aggregator
// Description: Roll-up of partition step metrics into the parent step.
// Purpose: Merge fanned-out partition results into one logical step result.
// Dependencies: crate::interfaces, crate::model, tracing
// ============================================================================

//! ## Overview
//! A partitioned step runs each partition as a synthetic job instance named
//! `:<root>:<step>:<index>`. [`PartitionAggregator::aggregate`] resolves the
//! root instance from the root execution, sums the eight counters over every
//! step execution hosted by those partitions, and writes the totals onto the
//! parent step execution together with the step's final batch and exit
//! status when the caller supplies them.
//!
//! The totals are recomputed from the partition rows on every call, so a
//! repeated call writes the same numbers again. The aggregator does not wait
//! for partitions; the caller invokes it after they have all finished.

// ============================================================================
// SECTION: Imports
// ============================================================================

use tracing::debug;
use tracing::info;

use crate::interfaces::ExecutionHistoryStore;
use crate::interfaces::LedgerError;
use crate::interfaces::ensure_step_name;
use crate::model::BatchStatus;
use crate::model::JobExecutionId;
use crate::model::JobInstance;
use crate::model::JobInstanceId;
use crate::model::PartitionInstanceName;
use crate::model::StepExecutionId;
use crate::model::StepExecutionUpdate;
use crate::model::StepMetrics;
use crate::model::Timestamp;

// ============================================================================
// SECTION: Partition Aggregator
// ============================================================================

/// Partition metric roll-up over an execution history store.
#[derive(Debug)]
pub struct PartitionAggregator<'a, S: ?Sized> {
    /// Backing history store.
    store: &'a S,
}

impl<S: ?Sized> Clone for PartitionAggregator<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: ?Sized> Copy for PartitionAggregator<'_, S> {}

impl<'a, S: ExecutionHistoryStore + ?Sized> PartitionAggregator<'a, S> {
    /// Creates an aggregator over `store`.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self {
            store,
        }
    }

    /// Sums partition metrics for `step_name` under the root execution's
    /// instance. Zero partitions sum to zero.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NoSuchExecution`] when the root execution is
    /// unknown and [`LedgerError::Invalid`] when a sum overflows.
    pub fn totals(
        &self,
        root_execution_id: JobExecutionId,
        step_name: &str,
    ) -> Result<StepMetrics, LedgerError> {
        ensure_step_name(step_name)?;
        let root = self.store.job_instance_id_for_execution(root_execution_id)?;
        let rows = self.store.partition_step_metrics(root, step_name)?;
        let partitions = rows.len();
        let totals = rows.into_iter().try_fold(StepMetrics::default(), |sum, metrics| {
            sum.checked_add(metrics).ok_or_else(|| {
                LedgerError::Invalid(format!(
                    "partition metrics for ({root}, {step_name}) overflow"
                ))
            })
        })?;
        debug!(root = root.get(), step_name, partitions, "partition metrics summed");
        Ok(totals)
    }

    /// Writes the partition totals and `end_time` onto the parent step
    /// execution and returns the totals.
    ///
    /// When `final_status` is given, the parent's batch and exit status are
    /// set in the same update; otherwise they are left as stored. The parent's
    /// persistent user data is preserved.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NoSuchExecution`] when the root execution or the
    /// parent step execution is unknown.
    pub fn aggregate(
        &self,
        root_execution_id: JobExecutionId,
        step_name: &str,
        parent_step_execution_id: StepExecutionId,
        end_time: Timestamp,
        final_status: Option<(BatchStatus, &str)>,
    ) -> Result<StepMetrics, LedgerError> {
        let totals = self.totals(root_execution_id, step_name)?;
        let parent = self.store.get_step_execution(parent_step_execution_id)?.ok_or_else(|| {
            LedgerError::NoSuchExecution(format!("step execution {parent_step_execution_id}"))
        })?;
        let mut update = StepExecutionUpdate::metrics(totals, parent.persistent_user_data)
            .with_end_time(end_time);
        if let Some((batch_status, exit_status)) = final_status {
            update = update.with_status(batch_status, exit_status);
        }
        self.store.update_step_execution_metrics(parent_step_execution_id, &update)?;
        info!(
            root_execution_id = root_execution_id.get(),
            step_name,
            parent_step_execution_id = parent_step_execution_id.get(),
            write_count = totals.write_count,
            "partition metrics aggregated"
        );
        Ok(totals)
    }
}

/// Creates `count` synthetic partition instances for a step of `root`.
///
/// # Errors
///
/// Returns [`LedgerError`] when the step name is invalid or the store fails.
pub fn create_partition_instances<S: ExecutionHistoryStore + ?Sized>(
    store: &S,
    root: JobInstanceId,
    step_name: &str,
    count: u32,
    app_tag: &str,
) -> Result<Vec<JobInstance>, LedgerError> {
    ensure_step_name(step_name)?;
    (0 .. count)
        .map(|index| {
            let name = PartitionInstanceName::new(root, step_name, index);
            store.create_sub_job_instance(&name, app_tag)
        })
        .collect()
}
