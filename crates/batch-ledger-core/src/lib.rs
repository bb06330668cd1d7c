// crates/batch-ledger-core/src/lib.rs
// ============================================================================
// Module: Batch Ledger Core Library
// Description: Public API surface for the batch ledger core.
// Purpose: Expose ledger types, store contracts, and runtime helpers.
// Dependencies: crate::{codec, interfaces, model, runtime}
// ============================================================================

//! ## Overview
//! Batch ledger core holds the durable state model of a batch-job runtime:
//! job instances, job and step executions, current job/step status records,
//! and reader/writer checkpoint tokens. Storage backends plug in through the
//! store contracts in [`interfaces`]; the runtime helpers layer status
//! transitions, typed checkpoint access, and partition roll-up on top of them.
//! The core never spawns threads and never interprets caller payloads.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod codec;
pub mod interfaces;
pub mod model;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use model::*;

pub use codec::BlobCodec;
pub use codec::CodecError;
pub use codec::FrameCodec;
pub use codec::JsonCodec;
pub use codec::RawBytesCodec;
pub use interfaces::CheckpointStore;
pub use interfaces::ExecutionHistoryStore;
pub use interfaces::LedgerError;
pub use interfaces::LedgerStore;
pub use interfaces::MAX_STEP_NAME_BYTES;
pub use interfaces::StatusStore;
pub use interfaces::ensure_step_name;
pub use runtime::CheckpointLedger;
pub use runtime::InMemoryLedgerStore;
pub use runtime::PartitionAggregator;
pub use runtime::StatusTracker;
pub use runtime::create_partition_instances;
