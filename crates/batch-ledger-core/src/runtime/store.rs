// crates/batch-ledger-core/src/runtime/store.rs
// ============================================================================
// Module: Batch Ledger In-Memory Store
// Description: Mutex-guarded in-memory ledger store for tests and demos.
// Purpose: Provide a deterministic ledger backend without external deps.
// Dependencies: crate::interfaces, crate::model
// ============================================================================

//! ## Overview
//! [`InMemoryLedgerStore`] keeps every ledger table in one mutex-guarded set
//! of ordered maps. Each trait call takes the lock once, so every operation
//! is atomic with respect to the others. Query ordering and error kinds
//! follow the SQLite backend so the same scenarios run against both. It is
//! not intended for production use; nothing survives the process.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::num::NonZeroU64;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::interfaces::CheckpointStore;
use crate::interfaces::ExecutionHistoryStore;
use crate::interfaces::LedgerError;
use crate::interfaces::LedgerStore;
use crate::interfaces::StatusStore;
use crate::interfaces::ensure_step_name;
use crate::model::BatchStatus;
use crate::model::CheckpointKey;
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
// SECTION: Tables
// ============================================================================

/// Ledger tables guarded by the store mutex.
#[derive(Debug, Default)]
struct Tables {
    /// Last issued job instance id.
    last_instance_id: u64,
    /// Last issued job execution id.
    last_execution_id: u64,
    /// Last issued step execution id.
    last_step_execution_id: u64,
    /// Job instances by id.
    instances: BTreeMap<JobInstanceId, JobInstance>,
    /// Job executions by id.
    executions: BTreeMap<JobExecutionId, JobExecution>,
    /// Step executions by id.
    step_executions: BTreeMap<StepExecutionId, StepExecution>,
    /// Job status records by instance id.
    job_statuses: BTreeMap<JobInstanceId, JobStatus>,
    /// Step status records by status id.
    step_statuses: BTreeMap<StepExecutionId, StepStatus>,
    /// Checkpoint tokens by encoded key.
    checkpoints: BTreeMap<String, Option<Vec<u8>>>,
}

impl Tables {
    /// Returns the execution or a `NoSuchExecution` error.
    fn execution(&self, job_execution_id: JobExecutionId) -> Result<&JobExecution, LedgerError> {
        self.executions
            .get(&job_execution_id)
            .ok_or_else(|| LedgerError::NoSuchExecution(format!("job execution {job_execution_id}")))
    }

    /// Returns the execution mutably or a `NoSuchExecution` error.
    fn execution_mut(
        &mut self,
        job_execution_id: JobExecutionId,
    ) -> Result<&mut JobExecution, LedgerError> {
        self.executions
            .get_mut(&job_execution_id)
            .ok_or_else(|| LedgerError::NoSuchExecution(format!("job execution {job_execution_id}")))
    }

    /// Iterates step executions hosted by executions of an instance.
    fn instance_step_executions(
        &self,
        job_instance_id: JobInstanceId,
    ) -> impl DoubleEndedIterator<Item = &StepExecution> {
        self.step_executions.values().filter(move |step| {
            self.executions
                .get(&step.job_execution_id)
                .is_some_and(|execution| execution.job_instance_id == job_instance_id)
        })
    }

    /// Inserts a job instance under a fresh id.
    fn insert_instance(
        &mut self,
        name: String,
        app_tag: &str,
        job_definition: Option<&str>,
    ) -> Result<JobInstance, LedgerError> {
        let id = JobInstanceId::new(next_id(&mut self.last_instance_id)?);
        let instance = JobInstance {
            id,
            name,
            app_tag: app_tag.to_string(),
            job_definition: job_definition.map(str::to_string),
        };
        self.instances.insert(id, instance.clone());
        Ok(instance)
    }
}

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory ledger store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLedgerStore {
    /// Ledger tables protected by a mutex.
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryLedgerStore {
    /// Creates an empty in-memory ledger store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the tables.
    fn tables(&self) -> Result<MutexGuard<'_, Tables>, LedgerError> {
        self.tables
            .lock()
            .map_err(|_| LedgerError::StoreUnavailable("ledger store mutex poisoned".to_string()))
    }
}

// ============================================================================
// SECTION: Checkpoint Store
// ============================================================================

impl CheckpointStore for InMemoryLedgerStore {
    fn create_checkpoint_pair(
        &self,
        job_instance_id: JobInstanceId,
        step_name: &str,
    ) -> Result<(), LedgerError> {
        ensure_step_name(step_name)?;
        let (reader, writer) = CheckpointKey::pair(job_instance_id, step_name);
        let (reader, writer) = (reader.encode(), writer.encode());
        let mut tables = self.tables()?;
        if tables.checkpoints.contains_key(&reader) || tables.checkpoints.contains_key(&writer) {
            return Err(LedgerError::AlreadyExists(format!(
                "checkpoint pair ({job_instance_id}, {step_name})"
            )));
        }
        tables.checkpoints.insert(reader, None);
        tables.checkpoints.insert(writer, None);
        Ok(())
    }

    fn get_checkpoint_pair(
        &self,
        job_instance_id: JobInstanceId,
        step_name: &str,
    ) -> Result<Option<CheckpointPair>, LedgerError> {
        let (reader, writer) = CheckpointKey::pair(job_instance_id, step_name);
        let tables = self.tables()?;
        let reader = tables.checkpoints.get(&reader.encode());
        let writer = tables.checkpoints.get(&writer.encode());
        match (reader, writer) {
            (None, None) => Ok(None),
            (Some(reader), Some(writer)) => {
                Ok(Some(CheckpointPair::new(reader.clone(), writer.clone())))
            }
            _ => Err(LedgerError::DecodeFailure(format!(
                "checkpoint pair ({job_instance_id}, {step_name}) has only one of its rows"
            ))),
        }
    }

    fn update_checkpoint_pair(
        &self,
        job_instance_id: JobInstanceId,
        step_name: &str,
        pair: &CheckpointPair,
    ) -> Result<(), LedgerError> {
        let (reader, writer) = CheckpointKey::pair(job_instance_id, step_name);
        let (reader, writer) = (reader.encode(), writer.encode());
        let mut tables = self.tables()?;
        if !tables.checkpoints.contains_key(&reader) || !tables.checkpoints.contains_key(&writer) {
            return Err(LedgerError::NotFound(format!(
                "checkpoint pair ({job_instance_id}, {step_name})"
            )));
        }
        tables.checkpoints.insert(reader, pair.reader.clone());
        tables.checkpoints.insert(writer, pair.writer.clone());
        Ok(())
    }
}

// ============================================================================
// SECTION: Status Store
// ============================================================================

impl StatusStore for InMemoryLedgerStore {
    fn create_job_status(&self, job_instance_id: JobInstanceId) -> Result<JobStatus, LedgerError> {
        let mut tables = self.tables()?;
        if !tables.instances.contains_key(&job_instance_id) {
            return Err(LedgerError::NotFound(format!("job instance {job_instance_id}")));
        }
        if tables.job_statuses.contains_key(&job_instance_id) {
            return Err(LedgerError::AlreadyExists(format!("job status {job_instance_id}")));
        }
        let status = JobStatus::new(job_instance_id);
        tables.job_statuses.insert(job_instance_id, status.clone());
        Ok(status)
    }

    fn get_job_status(
        &self,
        job_instance_id: JobInstanceId,
    ) -> Result<Option<JobStatus>, LedgerError> {
        Ok(self.tables()?.job_statuses.get(&job_instance_id).cloned())
    }

    fn update_job_status(&self, status: &JobStatus) -> Result<(), LedgerError> {
        let mut tables = self.tables()?;
        let slot = tables.job_statuses.get_mut(&status.job_instance_id).ok_or_else(|| {
            LedgerError::NotFound(format!("job status {}", status.job_instance_id))
        })?;
        *slot = status.clone();
        Ok(())
    }

    fn get_job_status_for_execution(
        &self,
        job_execution_id: JobExecutionId,
    ) -> Result<Option<JobStatus>, LedgerError> {
        let tables = self.tables()?;
        let job_instance_id = tables.execution(job_execution_id)?.job_instance_id;
        Ok(tables.job_statuses.get(&job_instance_id).cloned())
    }

    fn create_step_status(
        &self,
        step_execution_id: StepExecutionId,
    ) -> Result<StepStatus, LedgerError> {
        let mut tables = self.tables()?;
        if !tables.step_executions.contains_key(&step_execution_id) {
            return Err(LedgerError::NoSuchExecution(format!(
                "step execution {step_execution_id}"
            )));
        }
        if tables.step_statuses.contains_key(&step_execution_id) {
            return Err(LedgerError::AlreadyExists(format!("step status {step_execution_id}")));
        }
        let status = StepStatus::new(step_execution_id);
        tables.step_statuses.insert(step_execution_id, status.clone());
        Ok(status)
    }

    fn get_step_status(
        &self,
        job_instance_id: JobInstanceId,
        step_name: &str,
    ) -> Result<Option<StepStatus>, LedgerError> {
        let tables = self.tables()?;
        let status = tables
            .instance_step_executions(job_instance_id)
            .filter(|step| step.step_name == step_name)
            .find_map(|step| tables.step_statuses.get(&step.id))
            .cloned();
        Ok(status)
    }

    fn update_step_status(&self, status: &StepStatus) -> Result<(), LedgerError> {
        let mut tables = self.tables()?;
        let slot = tables
            .step_statuses
            .get_mut(&status.status_id)
            .ok_or_else(|| LedgerError::NotFound(format!("step status {}", status.status_id)))?;
        *slot = status.clone();
        Ok(())
    }

    fn increment_step_start_count(&self, status_id: StepExecutionId) -> Result<u32, LedgerError> {
        let mut tables = self.tables()?;
        let status = tables
            .step_statuses
            .get_mut(&status_id)
            .ok_or_else(|| LedgerError::NotFound(format!("step status {status_id}")))?;
        status.start_count = status.start_count.checked_add(1).ok_or_else(|| {
            LedgerError::Invalid(format!("step status {status_id} start count overflow"))
        })?;
        Ok(status.start_count)
    }
}

// ============================================================================
// SECTION: Execution History Store
// ============================================================================

impl ExecutionHistoryStore for InMemoryLedgerStore {
    fn create_job_instance(
        &self,
        name: &str,
        app_tag: &str,
        job_definition: Option<&str>,
    ) -> Result<JobInstance, LedgerError> {
        self.tables()?.insert_instance(name.to_string(), app_tag, job_definition)
    }

    fn create_sub_job_instance(
        &self,
        name: &PartitionInstanceName,
        app_tag: &str,
    ) -> Result<JobInstance, LedgerError> {
        self.tables()?.insert_instance(name.to_string(), app_tag, None)
    }

    fn get_job_instance(
        &self,
        job_instance_id: JobInstanceId,
    ) -> Result<Option<JobInstance>, LedgerError> {
        Ok(self.tables()?.instances.get(&job_instance_id).cloned())
    }

    fn app_tag_for_instance(&self, job_instance_id: JobInstanceId) -> Result<String, LedgerError> {
        self.tables()?
            .instances
            .get(&job_instance_id)
            .map(|instance| instance.app_tag.clone())
            .ok_or_else(|| LedgerError::NotFound(format!("job instance {job_instance_id}")))
    }

    fn job_instance_count(&self, name: &str, app_tag: Option<&str>) -> Result<u64, LedgerError> {
        let tables = self.tables()?;
        let count = tables
            .instances
            .values()
            .filter(|instance| instance_matches(instance, name, app_tag))
            .count();
        u64::try_from(count).map_err(|_| LedgerError::Invalid("instance count overflow".to_string()))
    }

    fn job_instance_ids(
        &self,
        name: &str,
        app_tag: Option<&str>,
        start: usize,
        count: usize,
    ) -> Result<Vec<JobInstanceId>, LedgerError> {
        let tables = self.tables()?;
        Ok(tables
            .instances
            .values()
            .rev()
            .filter(|instance| instance_matches(instance, name, app_tag))
            .skip(start)
            .take(count)
            .map(|instance| instance.id)
            .collect())
    }

    fn external_job_instances(&self) -> Result<BTreeMap<JobInstanceId, String>, LedgerError> {
        let tables = self.tables()?;
        Ok(tables
            .instances
            .values()
            .filter(|instance| !instance.is_partition())
            .map(|instance| (instance.id, instance.name.clone()))
            .collect())
    }

    fn create_job_execution(
        &self,
        job_instance_id: JobInstanceId,
        parameters: &JobParameters,
        initial_status: BatchStatus,
        create_time: Timestamp,
    ) -> Result<JobExecutionId, LedgerError> {
        let mut tables = self.tables()?;
        let job_name = tables
            .instances
            .get(&job_instance_id)
            .map(|instance| instance.name.clone())
            .ok_or_else(|| LedgerError::NotFound(format!("job instance {job_instance_id}")))?;
        let id = JobExecutionId::new(next_id(&mut tables.last_execution_id)?);
        tables.executions.insert(
            id,
            JobExecution {
                id,
                job_instance_id,
                job_name,
                create_time,
                start_time: None,
                end_time: None,
                last_update_time: create_time,
                batch_status: initial_status,
                exit_status: None,
                parameters: parameters.clone(),
            },
        );
        Ok(id)
    }

    fn mark_job_started(
        &self,
        job_execution_id: JobExecutionId,
        start_time: Timestamp,
    ) -> Result<(), LedgerError> {
        let mut tables = self.tables()?;
        let execution = tables.execution_mut(job_execution_id)?;
        execution.batch_status = BatchStatus::Started;
        execution.start_time = Some(start_time);
        execution.last_update_time = start_time;
        Ok(())
    }

    fn update_batch_status_only(
        &self,
        job_execution_id: JobExecutionId,
        batch_status: BatchStatus,
        update_time: Timestamp,
    ) -> Result<(), LedgerError> {
        let mut tables = self.tables()?;
        let execution = tables.execution_mut(job_execution_id)?;
        execution.batch_status = batch_status;
        execution.last_update_time = update_time;
        Ok(())
    }

    fn finalize_job_execution(
        &self,
        job_execution_id: JobExecutionId,
        batch_status: BatchStatus,
        exit_status: &str,
        end_time: Timestamp,
    ) -> Result<(), LedgerError> {
        let mut tables = self.tables()?;
        let execution = tables.execution_mut(job_execution_id)?;
        execution.batch_status = batch_status;
        execution.exit_status = Some(exit_status.to_string());
        execution.end_time = Some(end_time);
        execution.last_update_time = end_time;
        Ok(())
    }

    fn get_job_execution(
        &self,
        job_execution_id: JobExecutionId,
    ) -> Result<Option<JobExecution>, LedgerError> {
        Ok(self.tables()?.executions.get(&job_execution_id).cloned())
    }

    fn job_executions_for_instance(
        &self,
        job_instance_id: JobInstanceId,
    ) -> Result<Vec<JobExecution>, LedgerError> {
        let tables = self.tables()?;
        Ok(tables
            .executions
            .values()
            .rev()
            .filter(|execution| execution.job_instance_id == job_instance_id)
            .cloned()
            .collect())
    }

    fn running_execution_ids(&self, job_name: &str) -> Result<Vec<JobExecutionId>, LedgerError> {
        let tables = self.tables()?;
        Ok(tables
            .executions
            .values()
            .filter(|execution| execution.job_name == job_name && execution.batch_status.is_running())
            .map(|execution| execution.id)
            .collect())
    }

    fn job_instance_id_for_execution(
        &self,
        job_execution_id: JobExecutionId,
    ) -> Result<JobInstanceId, LedgerError> {
        Ok(self.tables()?.execution(job_execution_id)?.job_instance_id)
    }

    fn job_parameters(
        &self,
        job_execution_id: JobExecutionId,
    ) -> Result<JobParameters, LedgerError> {
        Ok(self.tables()?.execution(job_execution_id)?.parameters.clone())
    }

    fn app_tag_for_execution(
        &self,
        job_execution_id: JobExecutionId,
    ) -> Result<String, LedgerError> {
        let tables = self.tables()?;
        let job_instance_id = tables.execution(job_execution_id)?.job_instance_id;
        tables
            .instances
            .get(&job_instance_id)
            .map(|instance| instance.app_tag.clone())
            .ok_or_else(|| LedgerError::NoSuchExecution(format!("job execution {job_execution_id}")))
    }

    fn most_recent_execution_id(
        &self,
        job_instance_id: JobInstanceId,
    ) -> Result<Option<JobExecutionId>, LedgerError> {
        let tables = self.tables()?;
        Ok(tables
            .executions
            .values()
            .filter(|execution| execution.job_instance_id == job_instance_id)
            .max_by_key(|execution| (execution.create_time, execution.id))
            .map(|execution| execution.id))
    }

    fn create_step_execution(
        &self,
        job_execution_id: JobExecutionId,
        step_name: &str,
        initial_metrics: &StepMetrics,
        start_time: Timestamp,
    ) -> Result<StepExecutionId, LedgerError> {
        ensure_step_name(step_name)?;
        let mut tables = self.tables()?;
        tables.execution(job_execution_id)?;
        let id = StepExecutionId::new(next_id(&mut tables.last_step_execution_id)?);
        tables.step_executions.insert(
            id,
            StepExecution {
                id,
                job_execution_id,
                step_name: step_name.to_string(),
                batch_status: BatchStatus::Starting,
                exit_status: None,
                metrics: *initial_metrics,
                start_time,
                end_time: None,
                persistent_user_data: None,
            },
        );
        Ok(id)
    }

    fn update_step_execution_metrics(
        &self,
        step_execution_id: StepExecutionId,
        update: &StepExecutionUpdate,
    ) -> Result<(), LedgerError> {
        let mut tables = self.tables()?;
        let step = tables
            .step_executions
            .get(&step_execution_id)
            .ok_or_else(|| LedgerError::NotFound(format!("step execution {step_execution_id}")))?;
        let owner = tables.execution(step.job_execution_id)?;
        check_step_update(step, owner)?;
        let step = tables
            .step_executions
            .get_mut(&step_execution_id)
            .ok_or_else(|| LedgerError::NotFound(format!("step execution {step_execution_id}")))?;
        step.metrics = update.metrics;
        step.persistent_user_data.clone_from(&update.persistent_user_data);
        if let Some(end_time) = update.end_time {
            step.end_time = Some(end_time);
        }
        if let Some(batch_status) = update.batch_status {
            step.batch_status = batch_status;
        }
        if let Some(exit_status) = &update.exit_status {
            step.exit_status = Some(exit_status.clone());
        }
        Ok(())
    }

    fn get_step_execution(
        &self,
        step_execution_id: StepExecutionId,
    ) -> Result<Option<StepExecution>, LedgerError> {
        Ok(self.tables()?.step_executions.get(&step_execution_id).cloned())
    }

    fn step_executions_for_job_execution(
        &self,
        job_execution_id: JobExecutionId,
    ) -> Result<Vec<StepExecution>, LedgerError> {
        let tables = self.tables()?;
        Ok(tables
            .step_executions
            .values()
            .filter(|step| step.job_execution_id == job_execution_id)
            .cloned()
            .collect())
    }

    fn most_recent_step_executions(
        &self,
        job_instance_id: JobInstanceId,
    ) -> Result<Vec<StepExecution>, LedgerError> {
        let tables = self.tables()?;
        let mut seen = BTreeSet::new();
        Ok(tables
            .instance_step_executions(job_instance_id)
            .rev()
            .filter(|step| seen.insert(step.step_name.clone()))
            .cloned()
            .collect())
    }

    fn partition_step_metrics(
        &self,
        root: JobInstanceId,
        step_name: &str,
    ) -> Result<Vec<StepMetrics>, LedgerError> {
        let tables = self.tables()?;
        let partitions: BTreeSet<JobInstanceId> = tables
            .instances
            .values()
            .filter(|instance| PartitionInstanceName::belongs_to(&instance.name, root, step_name))
            .map(|instance| instance.id)
            .collect();
        Ok(tables
            .step_executions
            .values()
            .filter(|step| {
                tables
                    .executions
                    .get(&step.job_execution_id)
                    .is_some_and(|execution| partitions.contains(&execution.job_instance_id))
            })
            .map(|step| step.metrics)
            .collect())
    }

    fn purge(&self, app_tag: &str) -> Result<PurgeSummary, LedgerError> {
        let mut tables = self.tables()?;
        let instances: BTreeSet<JobInstanceId> = tables
            .instances
            .values()
            .filter(|instance| instance.app_tag == app_tag)
            .map(|instance| instance.id)
            .collect();
        let executions: BTreeSet<JobExecutionId> = tables
            .executions
            .values()
            .filter(|execution| instances.contains(&execution.job_instance_id))
            .map(|execution| execution.id)
            .collect();
        let steps: BTreeSet<StepExecutionId> = tables
            .step_executions
            .values()
            .filter(|step| executions.contains(&step.job_execution_id))
            .map(|step| step.id)
            .collect();
        let prefixes: Vec<String> =
            instances.iter().map(|id| CheckpointKey::instance_prefix(*id)).collect();

        let step_statuses = drain(&mut tables.step_statuses, |id| steps.contains(id));
        let step_executions = drain(&mut tables.step_executions, |id| steps.contains(id));
        let job_statuses = drain(&mut tables.job_statuses, |id| instances.contains(id));
        let checkpoints = drain(&mut tables.checkpoints, |key| {
            prefixes.iter().any(|prefix| key.starts_with(prefix.as_str()))
        });
        let job_executions = drain(&mut tables.executions, |id| executions.contains(id));
        let job_instances = drain(&mut tables.instances, |id| instances.contains(id));
        Ok(PurgeSummary {
            job_instances,
            job_executions,
            step_executions,
            job_statuses,
            step_statuses,
            checkpoints,
        })
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn readiness(&self) -> Result<(), LedgerError> {
        self.tables().map(|_| ())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Issues the next id from a counter.
fn next_id(counter: &mut u64) -> Result<NonZeroU64, LedgerError> {
    let next = counter
        .checked_add(1)
        .and_then(NonZeroU64::new)
        .ok_or_else(|| LedgerError::StoreUnavailable("ledger id space exhausted".to_string()))?;
    *counter = next.get();
    Ok(next)
}

/// Returns true when an instance matches a name and optional app tag.
fn instance_matches(instance: &JobInstance, name: &str, app_tag: Option<&str>) -> bool {
    instance.name == name && app_tag.is_none_or(|tag| instance.app_tag == tag)
}

/// Refuses step updates once the owning execution is terminal.
fn check_step_update(step: &StepExecution, owner: &JobExecution) -> Result<(), LedgerError> {
    if owner.batch_status.is_terminal() {
        return Err(LedgerError::InvalidTransition(format!(
            "step execution {} belongs to job execution {} which is {}",
            step.id, owner.id, owner.batch_status
        )));
    }
    Ok(())
}

/// Removes matching entries and returns how many were removed.
fn drain<K: Ord, V>(map: &mut BTreeMap<K, V>, matches: impl Fn(&K) -> bool) -> usize {
    let before = map.len();
    map.retain(|key, _| !matches(key));
    before - map.len()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        reason = "Test-only assertions and helpers are permitted."
    )]

    use super::*;

    #[test]
    fn half_checkpoint_pair_is_a_decode_failure() {
        let store = InMemoryLedgerStore::new();
        let instance = JobInstanceId::new(NonZeroU64::MIN);
        store.create_checkpoint_pair(instance, "load").unwrap();
        let (_, writer) = CheckpointKey::pair(instance, "load");
        store.tables().unwrap().checkpoints.remove(&writer.encode());

        let error = store.get_checkpoint_pair(instance, "load").unwrap_err();
        assert!(matches!(error, LedgerError::DecodeFailure(_)));
    }
}
