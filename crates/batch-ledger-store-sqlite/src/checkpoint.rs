// crates/batch-ledger-store-sqlite/src/checkpoint.rs
// ============================================================================
// Module: SQLite Checkpoint Store
// Description: Reader/writer checkpoint rows in `checkpointdata`.
// Purpose: Persist restart tokens under collision-free composite keys.
// Dependencies: batch-ledger-core, rusqlite, tracing
// ============================================================================

//! ## Overview
//! Each (instance, step) pair owns two rows keyed by
//! `"<instance>,<step>,READER"` and `"<instance>,<step>,WRITER"`. Both rows
//! are inserted or updated in one transaction so the pair never exists by
//! halves.

// ============================================================================
// SECTION: Imports
// ============================================================================

use batch_ledger_core::CheckpointKey;
use batch_ledger_core::CheckpointPair;
use batch_ledger_core::CheckpointStore;
use batch_ledger_core::JobInstanceId;
use batch_ledger_core::LedgerError;
use batch_ledger_core::ensure_step_name;
use rusqlite::params;
use tracing::debug;

use crate::rows::decode_token;
use crate::rows::encode_token;
use crate::store::SqliteLedgerStore;
use crate::store::SqliteStoreError;
use crate::store::db_error;

// ============================================================================
// SECTION: Checkpoint Store
// ============================================================================

impl CheckpointStore for SqliteLedgerStore {
    fn create_checkpoint_pair(
        &self,
        job_instance_id: JobInstanceId,
        step_name: &str,
    ) -> Result<(), LedgerError> {
        ensure_step_name(step_name)?;
        let (reader, writer) = CheckpointKey::pair(job_instance_id, step_name);
        let (reader, writer) = (reader.encode(), writer.encode());
        let null_token = encode_token(None)?;
        self.write("create checkpoint pair", |tx| {
            let existing: i64 = tx
                .query_row(
                    "SELECT COUNT(*) FROM checkpointdata WHERE id IN (?1, ?2)",
                    params![reader, writer],
                    |row| row.get(0),
                )
                .map_err(db_error("create checkpoint pair"))?;
            if existing > 0 {
                return Err(SqliteStoreError::Conflict(format!(
                    "checkpoint pair ({job_instance_id}, {step_name})"
                )));
            }
            for key in [&reader, &writer] {
                tx.execute(
                    "INSERT INTO checkpointdata (id, obj) VALUES (?1, ?2)",
                    params![key, null_token],
                )
                .map_err(db_error("create checkpoint pair"))?;
            }
            Ok(())
        })?;
        debug!(job_instance_id = job_instance_id.get(), step_name, "checkpoint pair stored");
        Ok(())
    }

    fn get_checkpoint_pair(
        &self,
        job_instance_id: JobInstanceId,
        step_name: &str,
    ) -> Result<Option<CheckpointPair>, LedgerError> {
        let (reader, writer) = CheckpointKey::pair(job_instance_id, step_name);
        let (reader_key, writer_key) = (reader.encode(), writer.encode());
        let rows = self.read(|connection| {
            let mut stmt = connection
                .prepare("SELECT id, obj FROM checkpointdata WHERE id IN (?1, ?2)")
                .map_err(db_error("get checkpoint pair"))?;
            let rows = stmt
                .query_map(params![reader_key, writer_key], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
                })
                .map_err(db_error("get checkpoint pair"))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(db_error("get checkpoint pair"))?;
            Ok(rows)
        })?;
        let mut reader_token = None;
        let mut writer_token = None;
        for (key, blob) in rows {
            let token = decode_token(&blob, &format!("checkpoint {key}"))?;
            if key == reader_key {
                reader_token = Some(token);
            } else {
                writer_token = Some(token);
            }
        }
        match (reader_token, writer_token) {
            (None, None) => Ok(None),
            (Some(reader), Some(writer)) => Ok(Some(CheckpointPair::new(reader, writer))),
            (Some(_), None) => Err(SqliteStoreError::Corrupt(format!(
                "checkpoint pair ({job_instance_id}, {step_name}) is missing its writer row"
            ))
            .into()),
            (None, Some(_)) => Err(SqliteStoreError::Corrupt(format!(
                "checkpoint pair ({job_instance_id}, {step_name}) is missing its reader row"
            ))
            .into()),
        }
    }

    fn update_checkpoint_pair(
        &self,
        job_instance_id: JobInstanceId,
        step_name: &str,
        pair: &CheckpointPair,
    ) -> Result<(), LedgerError> {
        let (reader, writer) = CheckpointKey::pair(job_instance_id, step_name);
        let reader_token = encode_token(pair.reader.as_deref())?;
        let writer_token = encode_token(pair.writer.as_deref())?;
        self.write("update checkpoint pair", |tx| {
            for (key, token) in [(reader.encode(), &reader_token), (writer.encode(), &writer_token)] {
                let changed = tx
                    .execute("UPDATE checkpointdata SET obj = ?2 WHERE id = ?1", params![key, token])
                    .map_err(db_error("update checkpoint pair"))?;
                if changed == 0 {
                    return Err(SqliteStoreError::Missing(format!(
                        "checkpoint pair ({job_instance_id}, {step_name})"
                    )));
                }
            }
            Ok(())
        })?;
        Ok(())
    }
}
