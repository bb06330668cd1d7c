// crates/batch-ledger-config/src/lib.rs
// ============================================================================
// Module: Batch Ledger Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for batch-ledger.toml semantics.
// Dependencies: batch-ledger-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `batch-ledger-config` defines the configuration model for the batch
//! ledger tooling: where the `SQLite` ledger lives, how it is tuned, and how
//! logs are filtered and formatted. Loading is strict and fail-closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
