// crates/batch-ledger-store-sqlite/tests/sqlite_store.rs
// ============================================================================
// Module: SQLite Ledger Store Tests
// Description: Driver scenarios and durability checks against SQLite.
// Purpose: Validate the SQLite store against the ledger store contracts.
// Dependencies: batch-ledger-core, batch-ledger-store-sqlite, proptest, rusqlite, tempfile
// ============================================================================
//! ## Overview
//! Runs the driver-facing scenarios against a real database file, then checks
//! what only a durable store can get wrong: reopening, damaged blob rows,
//! schema version drift, and invalid configuration.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use batch_ledger_core::BatchStatus;
use batch_ledger_core::CheckpointLedger;
use batch_ledger_core::CheckpointPair;
use batch_ledger_core::ExecutionHistoryStore;
use batch_ledger_core::JobExecutionId;
use batch_ledger_core::JobInstanceId;
use batch_ledger_core::JobParameters;
use batch_ledger_core::LedgerError;
use batch_ledger_core::LedgerStore;
use batch_ledger_core::PartitionAggregator;
use batch_ledger_core::PurgeSummary;
use batch_ledger_core::StatusTracker;
use batch_ledger_core::StepExecutionId;
use batch_ledger_core::StepExecutionUpdate;
use batch_ledger_core::StepMetrics;
use batch_ledger_core::Timestamp;
use batch_ledger_core::create_partition_instances;
use batch_ledger_store_sqlite::SqliteLedgerStore;
use batch_ledger_store_sqlite::SqliteStoreConfig;
use batch_ledger_store_sqlite::SqliteStoreError;
use batch_ledger_store_sqlite::SqliteStoreMode;
use proptest::prelude::*;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn open_store() -> (TempDir, SqliteLedgerStore) {
    let dir = TempDir::new().unwrap();
    let store = SqliteLedgerStore::new(SqliteStoreConfig::new(dir.path().join("ledger.db"))).unwrap();
    (dir, store)
}

fn at(millis: i64) -> Timestamp {
    Timestamp::from_unix_millis(millis)
}

fn start_job(store: &SqliteLedgerStore, name: &str, tag: &str) -> (JobInstanceId, JobExecutionId) {
    let instance = store.create_job_instance(name, tag, None).unwrap();
    let execution = store
        .create_job_execution(instance.id, &JobParameters::new(), BatchStatus::Starting, at(1_000))
        .unwrap();
    (instance.id, execution)
}

fn written(count: u64) -> StepMetrics {
    StepMetrics {
        write_count: count,
        ..StepMetrics::default()
    }
}

// ============================================================================
// SECTION: Execution History
// ============================================================================

/// Verifies the single-step job lifecycle end to end.
#[test]
fn completed_job_keeps_step_metrics() {
    let (_dir, store) = open_store();
    let (instance, execution) = start_job(&store, "orders", "tagA");
    store.mark_job_started(execution, at(1_100)).unwrap();
    let step = store.create_step_execution(execution, "load", &StepMetrics::default(), at(1_200)).unwrap();
    let created = store.get_step_execution(step).unwrap().unwrap();
    assert_eq!(created.batch_status, BatchStatus::Starting);
    assert_eq!(created.persistent_user_data, None);

    let metrics = StepMetrics {
        read_count: 50,
        write_count: 50,
        commit_count: 5,
        ..StepMetrics::default()
    };
    let update = StepExecutionUpdate::metrics(metrics, Some(vec![7, 7]))
        .with_end_time(at(2_000))
        .with_status(BatchStatus::Completed, "COMPLETED");
    store.update_step_execution_metrics(step, &update).unwrap();
    store.finalize_job_execution(execution, BatchStatus::Completed, "COMPLETED", at(2_000)).unwrap();

    let finished = store.get_job_execution(execution).unwrap().unwrap();
    assert_eq!(finished.batch_status, BatchStatus::Completed);
    assert_eq!(finished.job_name, "orders");
    assert_eq!(finished.start_time, Some(at(1_100)));
    assert_eq!(finished.end_time, Some(at(2_000)));
    let step_row = store.get_step_execution(step).unwrap().unwrap();
    assert_eq!(step_row.metrics, metrics);
    assert_eq!(step_row.batch_status, BatchStatus::Completed);
    assert_eq!(step_row.exit_status.as_deref(), Some("COMPLETED"));
    assert_eq!(step_row.persistent_user_data, Some(vec![7, 7]));
    assert_eq!(store.job_instance_id_for_execution(execution).unwrap(), instance);
    assert_eq!(store.step_executions_for_job_execution(execution).unwrap().len(), 1);
}

/// Verifies counters can be rewritten until the owning execution is terminal.
#[test]
fn step_updates_rejected_after_job_finalized() {
    let (_dir, store) = open_store();
    let (_, execution) = start_job(&store, "orders", "tagA");
    let step = store.create_step_execution(execution, "load", &written(10), at(1_200)).unwrap();
    store
        .update_step_execution_metrics(step, &StepExecutionUpdate::metrics(written(9), None))
        .unwrap();
    assert_eq!(store.get_step_execution(step).unwrap().unwrap().metrics.write_count, 9);

    store.finalize_job_execution(execution, BatchStatus::Failed, "FAILED", at(1_500)).unwrap();
    let error = store
        .update_step_execution_metrics(step, &StepExecutionUpdate::metrics(written(11), None))
        .unwrap_err();
    assert!(matches!(error, LedgerError::InvalidTransition(_)));
    assert_eq!(store.get_step_execution(step).unwrap().unwrap().metrics.write_count, 9);
}

/// Verifies unknown ids surface as `NoSuchExecution`.
#[test]
fn unknown_execution_ids_are_reported() {
    let (_dir, store) = open_store();
    let missing = JobExecutionId::from_raw(77).unwrap();
    assert!(matches!(store.mark_job_started(missing, at(1)), Err(LedgerError::NoSuchExecution(_))));
    assert!(matches!(
        store.finalize_job_execution(missing, BatchStatus::Failed, "FAILED", at(1)),
        Err(LedgerError::NoSuchExecution(_))
    ));
    assert!(matches!(store.job_parameters(missing), Err(LedgerError::NoSuchExecution(_))));
    assert!(matches!(store.app_tag_for_execution(missing), Err(LedgerError::NoSuchExecution(_))));
    assert!(matches!(
        store.create_step_execution(missing, "load", &StepMetrics::default(), at(1)),
        Err(LedgerError::NoSuchExecution(_))
    ));
    assert!(store.get_job_execution(missing).unwrap().is_none());
    let orphan = JobInstanceId::from_raw(5).unwrap();
    assert!(matches!(
        store.create_job_execution(orphan, &JobParameters::new(), BatchStatus::Starting, at(1)),
        Err(LedgerError::NotFound(_))
    ));
    assert!(matches!(store.app_tag_for_instance(orphan), Err(LedgerError::NotFound(_))));
}

/// Verifies instance listing, paging, and running-execution queries.
#[test]
fn instance_queries_filter_and_page() {
    let (_dir, store) = open_store();
    let (first, first_exec) = start_job(&store, "orders", "tagA");
    let (second, _) = start_job(&store, "orders", "tagB");
    let (third, _) = start_job(&store, "orders", "tagA");
    create_partition_instances(&store, first, "split", 2, "tagA").unwrap();
    store.finalize_job_execution(first_exec, BatchStatus::Completed, "COMPLETED", at(2)).unwrap();

    assert_eq!(store.job_instance_count("orders", None).unwrap(), 3);
    assert_eq!(store.job_instance_count("orders", Some("tagA")).unwrap(), 2);
    assert_eq!(store.job_instance_count("missing", None).unwrap(), 0);
    assert_eq!(store.job_instance_ids("orders", None, 0, 10).unwrap(), vec![third, second, first]);
    assert_eq!(store.job_instance_ids("orders", Some("tagA"), 1, 5).unwrap(), vec![first]);
    assert!(store.job_instance_ids("orders", None, 5, 1).unwrap().is_empty());
    assert_eq!(store.job_instance_ids("orders", None, 0, usize::MAX).unwrap().len(), 3);

    let external = store.external_job_instances().unwrap();
    assert_eq!(external.keys().copied().collect::<Vec<_>>(), vec![first, second, third]);

    let running = store.running_execution_ids("orders").unwrap();
    assert_eq!(running.len(), 2);
    assert!(!running.contains(&first_exec));
    assert_eq!(store.app_tag_for_execution(first_exec).unwrap(), "tagA");
    assert_eq!(store.app_tag_for_instance(second).unwrap(), "tagB");
}

/// Verifies parameters and restart history queries.
#[test]
fn executions_list_newest_first() {
    let (_dir, store) = open_store();
    let instance = store.create_job_instance("orders", "tagA", Some("<job/>")).unwrap();
    let parameters: JobParameters = [("region", "eu"), ("day", "2024-01-01")].into_iter().collect();
    let first = store.create_job_execution(instance.id, &parameters, BatchStatus::Starting, at(10)).unwrap();
    let second = store.create_job_execution(instance.id, &parameters, BatchStatus::Starting, at(20)).unwrap();

    let ids: Vec<_> = store.job_executions_for_instance(instance.id).unwrap().iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![second, first]);
    assert_eq!(store.most_recent_execution_id(instance.id).unwrap(), Some(second));
    assert_eq!(store.job_parameters(first).unwrap(), parameters);
    assert_eq!(
        store.get_job_instance(instance.id).unwrap().unwrap().job_definition.as_deref(),
        Some("<job/>")
    );

    store.update_batch_status_only(second, BatchStatus::Stopping, at(30)).unwrap();
    let stopping = store.get_job_execution(second).unwrap().unwrap();
    assert_eq!(stopping.batch_status, BatchStatus::Stopping);
    assert_eq!(stopping.last_update_time, at(30));
    assert_eq!(stopping.end_time, None);

    let empty = store.create_job_instance("empty", "tagA", None).unwrap();
    assert_eq!(store.most_recent_execution_id(empty.id).unwrap(), None);
}

// ============================================================================
// SECTION: Partitions
// ============================================================================

/// Verifies three partitions roll up into the parent step, repeatably.
#[test]
fn partition_metrics_roll_up_idempotently() {
    let (_dir, store) = open_store();
    let (root, root_exec) = start_job(&store, "orders", "tagA");
    let parent = store.create_step_execution(root_exec, "split", &StepMetrics::default(), at(1_000)).unwrap();
    let partitions = create_partition_instances(&store, root, "split", 3, "tagA").unwrap();

    for (instance, count) in partitions.iter().zip([10, 20, 30]) {
        let execution = store
            .create_job_execution(instance.id, &JobParameters::new(), BatchStatus::Starting, at(1_000))
            .unwrap();
        store.create_step_execution(execution, "split", &written(count), at(1_000)).unwrap();
        store.finalize_job_execution(execution, BatchStatus::Completed, "COMPLETED", at(1_500)).unwrap();
    }

    let aggregator = PartitionAggregator::new(&store);
    let before = store.get_step_execution(parent).unwrap().unwrap();
    let first = aggregator.aggregate(root_exec, "split", parent, at(2_000), None).unwrap();
    let untouched = store.get_step_execution(parent).unwrap().unwrap();
    assert_eq!(untouched.batch_status, before.batch_status);
    assert_eq!(untouched.exit_status, before.exit_status);

    let second = aggregator
        .aggregate(root_exec, "split", parent, at(2_000), Some((BatchStatus::Completed, "COMPLETED")))
        .unwrap();
    assert_eq!(first.write_count, 60);
    assert_eq!(first, second);
    let parent_row = store.get_step_execution(parent).unwrap().unwrap();
    assert_eq!(parent_row.metrics.write_count, 60);
    assert_eq!(parent_row.end_time, Some(at(2_000)));
    assert_eq!(parent_row.batch_status, BatchStatus::Completed);
    assert_eq!(parent_row.exit_status.as_deref(), Some("COMPLETED"));
}

/// Verifies wildcard characters in step names never widen the match.
#[test]
fn partition_totals_ignore_lookalike_names() {
    let (_dir, store) = open_store();
    let (root, root_exec) = start_job(&store, "orders", "tagA");
    assert_eq!(PartitionAggregator::new(&store).totals(root_exec, "s_p").unwrap(), StepMetrics::default());

    for step in ["sxp", "s%p", "s_p:extra"] {
        let lookalike = create_partition_instances(&store, root, step, 1, "tagA").unwrap();
        let execution = store
            .create_job_execution(lookalike[0].id, &JobParameters::new(), BatchStatus::Starting, at(1))
            .unwrap();
        store.create_step_execution(execution, step, &written(5), at(1)).unwrap();
    }
    let aggregator = PartitionAggregator::new(&store);
    assert_eq!(aggregator.totals(root_exec, "s_p").unwrap(), StepMetrics::default());
    assert_eq!(aggregator.totals(root_exec, "sxp").unwrap().write_count, 5);
    assert_eq!(aggregator.totals(root_exec, "s%p").unwrap().write_count, 5);
}

/// Verifies aggregation reports a missing parent step execution.
#[test]
fn partition_aggregate_requires_parent() {
    let (_dir, store) = open_store();
    let (_, root_exec) = start_job(&store, "orders", "tagA");
    let missing = StepExecutionId::from_raw(999).unwrap();
    let error = PartitionAggregator::new(&store).aggregate(root_exec, "split", missing, at(1), None).unwrap_err();
    assert!(matches!(error, LedgerError::NoSuchExecution(_)));
}

// ============================================================================
// SECTION: Checkpoints
// ============================================================================

/// Verifies the restart token scenario and the pair lifecycle errors.
#[test]
fn checkpoint_tokens_survive_restart_reads() {
    let (_dir, store) = open_store();
    let (instance, _) = start_job(&store, "orders", "tagA");
    let ledger = CheckpointLedger::new(&store);

    assert!(matches!(ledger.get(instance, "load"), Err(LedgerError::NotFound(_))));
    ledger.create(instance, "load").unwrap();
    assert_eq!(ledger.get(instance, "load").unwrap(), CheckpointPair::empty());
    assert!(matches!(ledger.create(instance, "load"), Err(LedgerError::AlreadyExists(_))));

    ledger.update(instance, "load", &CheckpointPair::new(Some(vec![0x0A]), None)).unwrap();
    let pair = ledger.get(instance, "load").unwrap();
    assert_eq!(pair.reader, Some(vec![0x0A]));
    assert_eq!(pair.writer, None);
}

/// Verifies step names with commas and empty tokens stay distinct.
#[test]
fn checkpoint_keys_do_not_collide() {
    let (_dir, store) = open_store();
    let (instance, _) = start_job(&store, "orders", "tagA");
    let ledger = CheckpointLedger::new(&store);
    assert!(matches!(
        ledger.update(instance, "a,b", &CheckpointPair::empty()),
        Err(LedgerError::NotFound(_))
    ));
    ledger.create(instance, "a,b").unwrap();
    ledger.create(instance, "a").unwrap();
    ledger.update(instance, "a,b", &CheckpointPair::new(Some(Vec::new()), Some(vec![2]))).unwrap();
    assert_eq!(ledger.get(instance, "a").unwrap(), CheckpointPair::empty());
    assert_eq!(ledger.get(instance, "a,b").unwrap().reader, Some(Vec::new()));
    assert!(matches!(ledger.create(instance, ""), Err(LedgerError::Invalid(_))));
}

// ============================================================================
// SECTION: Status Tracking
// ============================================================================

/// Verifies a fresh job status and the restart transitions.
#[test]
fn job_status_transitions() {
    let (_dir, store) = open_store();
    let (instance, execution) = start_job(&store, "orders", "tagA");
    let tracker = StatusTracker::new(&store);

    let fresh = tracker.create_job_status(instance).unwrap();
    assert_eq!(fresh.batch_status, BatchStatus::Starting);
    assert_eq!(tracker.get_job_status(instance).unwrap(), fresh);
    assert!(matches!(tracker.create_job_status(instance), Err(LedgerError::AlreadyExists(_))));

    tracker.set_current_step(instance, "load").unwrap();
    tracker.set_execution_status(instance, BatchStatus::Stopped, "STOPPED").unwrap();
    tracker.set_restart_on(instance, Some("load")).unwrap();
    let stopped = tracker.get_job_status_for_execution(execution).unwrap();
    assert_eq!(stopped.restart_on.as_deref(), Some("load"));

    let next = store
        .create_job_execution(instance, &JobParameters::new(), BatchStatus::Starting, at(5_000))
        .unwrap();
    let advanced = tracker.advance_to_new_execution(instance, next).unwrap();
    assert_eq!(advanced.restart_on, None);
    assert_eq!(advanced.latest_execution_id, Some(next));
    assert_eq!(tracker.get_job_status(instance).unwrap(), advanced);
}

/// Verifies the step status follows its first record across restarts.
#[test]
fn step_status_keyed_by_first_entry() {
    let (_dir, store) = open_store();
    let (instance, execution) = start_job(&store, "orders", "tagA");
    let tracker = StatusTracker::new(&store);
    let first = store.create_step_execution(execution, "load", &StepMetrics::default(), at(1)).unwrap();
    let created = tracker.create_step_status(first).unwrap();
    assert_eq!(created.start_count, 0);
    assert_eq!(tracker.increment_start_count(created.status_id).unwrap(), 1);

    let restart = store
        .create_job_execution(instance, &JobParameters::new(), BatchStatus::Starting, at(2))
        .unwrap();
    let second = store.create_step_execution(restart, "load", &StepMetrics::default(), at(3)).unwrap();
    let mut status = tracker.get_step_status(instance, "load").unwrap();
    status.last_run_step_execution_id = Some(status.step_execution_id);
    status.step_execution_id = second;
    tracker.update_step_status(instance, "load", &status).unwrap();
    assert_eq!(tracker.increment_start_count(status.status_id).unwrap(), 2);

    let stored = tracker.get_step_status(instance, "load").unwrap();
    assert_eq!(stored.status_id, first);
    assert_eq!(stored.step_execution_id, second);
    assert_eq!(stored.start_count, 2);
    assert!(matches!(tracker.get_step_status(instance, "other"), Err(LedgerError::NotFound(_))));
}

/// Verifies `ABANDONED` survives a write attempt and a reopen.
#[test]
fn abandoned_job_status_is_sticky() {
    let dir = TempDir::new().unwrap();
    let config = SqliteStoreConfig::new(dir.path().join("ledger.db"));
    let instance = {
        let store = SqliteLedgerStore::new(config.clone()).unwrap();
        let (instance, _) = start_job(&store, "orders", "tagA");
        let tracker = StatusTracker::new(&store);
        tracker.create_job_status(instance).unwrap();
        tracker.set_batch_status(instance, BatchStatus::Abandoned).unwrap();
        instance
    };
    let store = SqliteLedgerStore::new(config).unwrap();
    let tracker = StatusTracker::new(&store);
    assert!(matches!(
        tracker.set_batch_status(instance, BatchStatus::Started),
        Err(LedgerError::InvalidTransition(_))
    ));
    assert_eq!(tracker.get_job_status(instance).unwrap().batch_status, BatchStatus::Abandoned);
}

// ============================================================================
// SECTION: Durability
// ============================================================================

/// Verifies committed rows are visible after reopening the database file.
#[test]
fn reopen_preserves_history() {
    let dir = TempDir::new().unwrap();
    let config = SqliteStoreConfig::new(dir.path().join("nested").join("ledger.db"));
    let (instance, execution) = {
        let store = SqliteLedgerStore::new(config.clone()).unwrap();
        let ids = start_job(&store, "orders", "tagA");
        CheckpointLedger::new(&store).create(ids.0, "load").unwrap();
        CheckpointLedger::new(&store)
            .update(ids.0, "load", &CheckpointPair::new(None, Some(vec![1, 2, 3])))
            .unwrap();
        ids
    };
    let store = SqliteLedgerStore::new(config).unwrap();
    assert_eq!(store.get_job_execution(execution).unwrap().unwrap().job_instance_id, instance);
    assert_eq!(CheckpointLedger::new(&store).get(instance, "load").unwrap().writer, Some(vec![1, 2, 3]));
    let (_, later) = start_job(&store, "orders", "tagA");
    assert!(later.get() > execution.get());
}

/// Verifies a damaged status blob is reported instead of coerced.
#[test]
fn corrupt_status_blob_is_reported() {
    let (dir, store) = open_store();
    let (instance, _) = start_job(&store, "orders", "tagA");
    StatusTracker::new(&store).create_job_status(instance).unwrap();

    let raw = rusqlite::Connection::open(dir.path().join("ledger.db")).unwrap();
    raw.busy_timeout(std::time::Duration::from_secs(5)).unwrap();
    raw.execute("UPDATE jobstatus SET obj = x'00ff'", []).unwrap();
    drop(raw);

    let error = StatusTracker::new(&store).get_job_status(instance).unwrap_err();
    assert!(matches!(error, LedgerError::DecodeFailure(_)));
}

/// Verifies a checkpoint pair with one row deleted is reported, not half-filled.
#[test]
fn half_checkpoint_pair_is_reported() {
    let (dir, store) = open_store();
    let (instance, _) = start_job(&store, "orders", "tagA");
    let ledger = CheckpointLedger::new(&store);
    ledger.create(instance, "load").unwrap();
    ledger.update(instance, "load", &CheckpointPair::new(Some(vec![1]), Some(vec![2]))).unwrap();

    let raw = rusqlite::Connection::open(dir.path().join("ledger.db")).unwrap();
    raw.busy_timeout(std::time::Duration::from_secs(5)).unwrap();
    let deleted = raw.execute("DELETE FROM checkpointdata WHERE id LIKE '%,WRITER'", []).unwrap();
    assert_eq!(deleted, 1);
    drop(raw);

    let error = ledger.get(instance, "load").unwrap_err();
    assert!(matches!(error, LedgerError::DecodeFailure(_)));
    assert!(error.to_string().contains("writer"));
}

/// Verifies a database stamped with another schema version is refused.
#[test]
fn schema_version_mismatch_is_refused() {
    let dir = TempDir::new().unwrap();
    let config = SqliteStoreConfig::new(dir.path().join("ledger.db"));
    drop(SqliteLedgerStore::new(config.clone()).unwrap());

    let raw = rusqlite::Connection::open(&config.path).unwrap();
    raw.execute("UPDATE store_meta SET version = 99", []).unwrap();
    drop(raw);

    let error = SqliteLedgerStore::new(config).err().unwrap();
    assert!(matches!(error, SqliteStoreError::VersionMismatch(_)));
    assert!(matches!(LedgerError::from(error), LedgerError::StoreUnavailable(_)));
}

/// Verifies invalid tuning is rejected before the file is touched.
#[test]
fn invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut config = SqliteStoreConfig::new(dir.path().join("ledger.db"));
    config.read_pool_size = 0;
    assert!(matches!(SqliteLedgerStore::new(config), Err(SqliteStoreError::Invalid(_))));
    assert!(!dir.path().join("ledger.db").exists());

    let error = SqliteLedgerStore::new(SqliteStoreConfig::new(dir.path())).unwrap_err();
    assert!(matches!(error, SqliteStoreError::Invalid(_)));
    assert!(error.to_string().contains("is a directory"));

    let mut config = SqliteStoreConfig::new(dir.path().join("legacy.db"));
    config.journal_mode = SqliteStoreMode::Delete;
    let store = SqliteLedgerStore::new(config).unwrap();
    assert!(store.readiness().is_ok());
}

/// Verifies purge removes a tag's rows and leaves other tags alone.
#[test]
fn purge_removes_only_matching_tag() {
    let (_dir, store) = open_store();
    let (purged, purged_exec) = start_job(&store, "orders", "tagA");
    let (kept, kept_exec) = start_job(&store, "orders", "tagB");
    for (instance, execution) in [(purged, purged_exec), (kept, kept_exec)] {
        let step = store.create_step_execution(execution, "load", &StepMetrics::default(), at(1)).unwrap();
        StatusTracker::new(&store).create_job_status(instance).unwrap();
        StatusTracker::new(&store).create_step_status(step).unwrap();
        CheckpointLedger::new(&store).create(instance, "load").unwrap();
    }

    let summary = store.purge("tagA").unwrap();
    assert_eq!(
        summary,
        PurgeSummary {
            job_instances: 1,
            job_executions: 1,
            step_executions: 1,
            job_statuses: 1,
            step_statuses: 1,
            checkpoints: 2,
        }
    );
    assert!(store.get_job_instance(purged).unwrap().is_none());
    assert!(store.get_job_instance(kept).unwrap().is_some());
    assert!(CheckpointLedger::new(&store).get(kept, "load").is_ok());
    assert!(store.readiness().is_ok());
    assert_eq!(store.purge("tagA").unwrap(), PurgeSummary::default());
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn most_recent_step_per_name(steps in prop::collection::vec(0_usize .. 4, 1 .. 16)) {
        let names = ["load", "transform", "write", "audit"];
        let (_dir, store) = open_store();
        let (instance, first_exec) = start_job(&store, "orders", "tagA");
        let restart = store
            .create_job_execution(instance, &JobParameters::new(), BatchStatus::Starting, at(2_000))
            .unwrap();
        let mut latest = std::collections::BTreeMap::new();
        for (position, step) in steps.into_iter().enumerate() {
            let execution = if position % 2 == 0 { first_exec } else { restart };
            let id = store
                .create_step_execution(execution, names[step], &StepMetrics::default(), at(1))
                .unwrap();
            latest.insert(names[step], id);
        }
        let recent = store.most_recent_step_executions(instance).unwrap();
        prop_assert_eq!(recent.len(), latest.len());
        for step in recent {
            prop_assert_eq!(latest.get(step.step_name.as_str()).copied(), Some(step.id));
        }
    }
}
