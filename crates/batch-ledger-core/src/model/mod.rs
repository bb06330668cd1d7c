// crates/batch-ledger-core/src/model/mod.rs
// ============================================================================
// Module: Batch Ledger Model
// Description: Canonical ledger records shared by every store backend.
// Purpose: Define identifiers, statuses, executions, and checkpoint keys.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Core types are plain data. They carry no storage behavior; backends map
//! them onto tables and the runtime helpers mutate them through the store
//! contracts.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod checkpoint;
pub mod execution;
pub mod identifiers;
pub mod partition;
pub mod status;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use checkpoint::CheckpointKey;
pub use checkpoint::CheckpointKeyError;
pub use checkpoint::CheckpointPair;
pub use checkpoint::CheckpointType;
pub use execution::JobExecution;
pub use execution::JobInstance;
pub use execution::JobParameters;
pub use execution::PurgeSummary;
pub use execution::StepExecution;
pub use execution::StepExecutionUpdate;
pub use execution::StepMetrics;
pub use identifiers::JobExecutionId;
pub use identifiers::JobInstanceId;
pub use identifiers::StepExecutionId;
pub use partition::PartitionInstanceName;
pub use partition::escape_like_pattern;
pub use status::BatchStatus;
pub use status::JobStatus;
pub use status::StepStatus;
pub use self::time::Timestamp;
