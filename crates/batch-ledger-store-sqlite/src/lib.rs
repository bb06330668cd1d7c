// crates/batch-ledger-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Ledger Store
// Description: Durable batch ledger backend using SQLite.
// Purpose: Persist execution history, status records, and checkpoints.
// Dependencies: batch-ledger-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides [`SqliteLedgerStore`], a `SQLite`-backed implementation
//! of every batch ledger store contract. Each operation runs in its own
//! transaction on a single write connection; reads are spread over a small
//! pool of read connections. Blob columns hold framed payloads and are
//! decoded strictly: a damaged row is reported, never patched over.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod checkpoint;
mod history;
mod rows;
mod schema;
mod status;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use schema::SCHEMA_VERSION;
pub use store::SqliteLedgerStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
