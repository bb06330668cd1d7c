// crates/batch-ledger-cli/src/lib.rs
// ============================================================================
// Module: Batch Ledger CLI Library
// Description: Shared helpers for the batch ledger command-line interface.
// Purpose: Provide logging initialization for the CLI binary and tests.
// Dependencies: batch-ledger-config, tracing-subscriber
// ============================================================================

//! ## Overview
//! This library houses the pieces of the `batch-ledger` binary that are worth
//! testing on their own. Library crates of the workspace only emit `tracing`
//! events; installing a subscriber is the binary's job and lives here.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod logging;
