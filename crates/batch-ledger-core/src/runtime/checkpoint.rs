// crates/batch-ledger-core/src/runtime/checkpoint.rs
// ============================================================================
// Module: Batch Ledger Checkpoint Ledger
// Description: Reader/writer restart token access over a checkpoint store.
// Purpose: Provide the driver-facing checkpoint API with typed token codecs.
// Dependencies: crate::codec, crate::interfaces, crate::model, tracing
// ============================================================================

//! ## Overview
//! [`CheckpointLedger`] wraps a [`CheckpointStore`]. Byte-level calls pass
//! tokens through untouched; the typed calls run the caller's own
//! [`BlobCodec`] pair so restart tokens are never decoded by a generic
//! object deserializer.

// ============================================================================
// SECTION: Imports
// ============================================================================

use tracing::debug;

use crate::codec::BlobCodec;
use crate::interfaces::CheckpointStore;
use crate::interfaces::LedgerError;
use crate::interfaces::ensure_step_name;
use crate::model::CheckpointPair;
use crate::model::JobInstanceId;

// ============================================================================
// SECTION: Checkpoint Ledger
// ============================================================================

/// Driver-facing checkpoint API.
#[derive(Debug)]
pub struct CheckpointLedger<'a, S: ?Sized> {
    /// Backing checkpoint store.
    store: &'a S,
}

impl<S: ?Sized> Clone for CheckpointLedger<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: ?Sized> Copy for CheckpointLedger<'_, S> {}

impl<'a, S: CheckpointStore + ?Sized> CheckpointLedger<'a, S> {
    /// Creates a ledger over `store`.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self {
            store,
        }
    }

    /// Creates both checkpoint rows for a step with null tokens.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AlreadyExists`] when either row exists.
    pub fn create(&self, job_instance_id: JobInstanceId, step_name: &str) -> Result<(), LedgerError> {
        ensure_step_name(step_name)?;
        self.store.create_checkpoint_pair(job_instance_id, step_name)?;
        debug!(job_instance_id = job_instance_id.get(), step_name, "checkpoint pair created");
        Ok(())
    }

    /// Returns the pair for a step, creating it with null tokens first when
    /// it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the store fails.
    pub fn ensure(
        &self,
        job_instance_id: JobInstanceId,
        step_name: &str,
    ) -> Result<CheckpointPair, LedgerError> {
        ensure_step_name(step_name)?;
        if let Some(pair) = self.store.get_checkpoint_pair(job_instance_id, step_name)? {
            return Ok(pair);
        }
        match self.create(job_instance_id, step_name) {
            Ok(()) | Err(LedgerError::AlreadyExists(_)) => self.get(job_instance_id, step_name),
            Err(err) => Err(err),
        }
    }

    /// Loads both tokens for a step.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] when the pair was never created.
    pub fn get(
        &self,
        job_instance_id: JobInstanceId,
        step_name: &str,
    ) -> Result<CheckpointPair, LedgerError> {
        ensure_step_name(step_name)?;
        self.store.get_checkpoint_pair(job_instance_id, step_name)?.ok_or_else(|| {
            LedgerError::NotFound(format!("checkpoint pair ({job_instance_id}, {step_name})"))
        })
    }

    /// Overwrites both tokens for a step.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] when the pair was never created.
    pub fn update(
        &self,
        job_instance_id: JobInstanceId,
        step_name: &str,
        pair: &CheckpointPair,
    ) -> Result<(), LedgerError> {
        ensure_step_name(step_name)?;
        self.store.update_checkpoint_pair(job_instance_id, step_name, pair)?;
        debug!(
            job_instance_id = job_instance_id.get(),
            step_name,
            reader_present = pair.reader.is_some(),
            writer_present = pair.writer.is_some(),
            "checkpoint pair updated"
        );
        Ok(())
    }

    /// Loads both tokens and decodes each with its own codec.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] when the pair was never created and
    /// [`LedgerError::DecodeFailure`] when a codec rejects its token.
    pub fn get_decoded<R: BlobCodec, W: BlobCodec>(
        &self,
        job_instance_id: JobInstanceId,
        step_name: &str,
        reader_codec: &R,
        writer_codec: &W,
    ) -> Result<(Option<R::Value>, Option<W::Value>), LedgerError> {
        let pair = self.get(job_instance_id, step_name)?;
        let context = format!("checkpoint pair ({job_instance_id}, {step_name})");
        let reader = pair
            .reader
            .as_deref()
            .map(|bytes| reader_codec.decode(bytes))
            .transpose()
            .map_err(|err| LedgerError::decode(&format!("{context} reader"), &err))?;
        let writer = pair
            .writer
            .as_deref()
            .map(|bytes| writer_codec.decode(bytes))
            .transpose()
            .map_err(|err| LedgerError::decode(&format!("{context} writer"), &err))?;
        Ok((reader, writer))
    }

    /// Encodes both tokens with their codecs and overwrites the pair.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Invalid`] when a codec rejects its value and
    /// [`LedgerError::NotFound`] when the pair was never created.
    pub fn update_encoded<R: BlobCodec, W: BlobCodec>(
        &self,
        job_instance_id: JobInstanceId,
        step_name: &str,
        reader: (&R, Option<&R::Value>),
        writer: (&W, Option<&W::Value>),
    ) -> Result<(), LedgerError> {
        let context = format!("checkpoint pair ({job_instance_id}, {step_name})");
        let (reader_codec, reader_value) = reader;
        let (writer_codec, writer_value) = writer;
        let reader = reader_value
            .map(|value| reader_codec.encode(value))
            .transpose()
            .map_err(|err| LedgerError::Invalid(format!("{context} reader: {err}")))?;
        let writer = writer_value
            .map(|value| writer_codec.encode(value))
            .transpose()
            .map_err(|err| LedgerError::Invalid(format!("{context} writer: {err}")))?;
        self.update(job_instance_id, step_name, &CheckpointPair::new(reader, writer))
    }
}
