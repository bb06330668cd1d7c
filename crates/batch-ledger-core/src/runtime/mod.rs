// crates/batch-ledger-core/src/runtime/mod.rs
// ============================================================================
// Module: Batch Ledger Runtime
// Description: Status transitions, checkpoint access, and partition roll-up.
// Purpose: Layer driver-facing ledger behavior over the store contracts.
// Dependencies: crate::{codec, interfaces, model}
// ============================================================================

//! ## Overview
//! Runtime helpers borrow a store supplied by the caller and hold no state of
//! their own. Every backend, the in-memory store included, is driven through
//! the same helpers so transition rules live in one place.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod checkpoint;
pub mod partition;
pub mod status;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use checkpoint::CheckpointLedger;
pub use partition::PartitionAggregator;
pub use partition::create_partition_instances;
pub use status::StatusTracker;
pub use store::InMemoryLedgerStore;
