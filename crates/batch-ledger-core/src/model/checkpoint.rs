// crates/batch-ledger-core/src/model/checkpoint.rs
// ============================================================================
// Module: Batch Ledger Checkpoint Keys
// Description: Composite keys and token pairs for reader/writer checkpoints.
// Purpose: Encode (instance, step, type) into one collision-free string key.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Checkpoint rows are keyed by `"<jobInstanceId>,<stepName>,<READER|WRITER>"`.
//! The instance id is all digits and the type label never contains a comma,
//! so splitting on the first and last comma recovers the step name exactly,
//! commas included. No escaping is needed for caller-chosen step names.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::model::identifiers::JobInstanceId;

// ============================================================================
// SECTION: Checkpoint Type
// ============================================================================

/// Which side of a chunk step a checkpoint token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckpointType {
    /// Item reader restart token.
    Reader,
    /// Item writer restart token.
    Writer,
}

impl CheckpointType {
    /// Returns the key label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reader => "READER",
            Self::Writer => "WRITER",
        }
    }

    /// Parses a key label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "READER" => Some(Self::Reader),
            "WRITER" => Some(Self::Writer),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Checkpoint Key
// ============================================================================

/// Errors returned when parsing a stored checkpoint key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckpointKeyError {
    /// Key is missing one of its three parts.
    #[error("checkpoint key is missing a separator: {0}")]
    MissingSeparator(String),
    /// Instance id part is not a positive integer.
    #[error("checkpoint key has an invalid job instance id: {0}")]
    InvalidInstance(String),
    /// Type part is not `READER` or `WRITER`.
    #[error("checkpoint key has an invalid type: {0}")]
    InvalidType(String),
}

/// Composite checkpoint key.
///
/// # Invariants
/// - [`CheckpointKey::encode`] is injective over `(job_instance_id, step_name, kind)`.
/// - [`CheckpointKey::parse`] inverts [`CheckpointKey::encode`] for every step name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CheckpointKey {
    /// Owning job instance.
    pub job_instance_id: JobInstanceId,
    /// Step name, verbatim.
    pub step_name: String,
    /// Reader or writer side.
    pub kind: CheckpointType,
}

impl CheckpointKey {
    /// Creates a key.
    #[must_use]
    pub fn new(job_instance_id: JobInstanceId, step_name: &str, kind: CheckpointType) -> Self {
        Self {
            job_instance_id,
            step_name: step_name.to_string(),
            kind,
        }
    }

    /// Returns the reader and writer keys for one step.
    #[must_use]
    pub fn pair(job_instance_id: JobInstanceId, step_name: &str) -> (Self, Self) {
        (
            Self::new(job_instance_id, step_name, CheckpointType::Reader),
            Self::new(job_instance_id, step_name, CheckpointType::Writer),
        )
    }

    /// Encodes the key into its stored string form.
    #[must_use]
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Returns the stored-key prefix shared by every checkpoint of an instance.
    #[must_use]
    pub fn instance_prefix(job_instance_id: JobInstanceId) -> String {
        format!("{job_instance_id},")
    }

    /// Parses a stored key.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointKeyError`] when the key is malformed.
    pub fn parse(value: &str) -> Result<Self, CheckpointKeyError> {
        let (id, rest) = value
            .split_once(',')
            .ok_or_else(|| CheckpointKeyError::MissingSeparator(value.to_string()))?;
        let (step_name, label) = rest
            .rsplit_once(',')
            .ok_or_else(|| CheckpointKeyError::MissingSeparator(value.to_string()))?;
        if id.is_empty() || !id.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(CheckpointKeyError::InvalidInstance(id.to_string()));
        }
        let job_instance_id = id
            .parse::<u64>()
            .ok()
            .and_then(JobInstanceId::from_raw)
            .ok_or_else(|| CheckpointKeyError::InvalidInstance(id.to_string()))?;
        let kind = CheckpointType::parse(label)
            .ok_or_else(|| CheckpointKeyError::InvalidType(label.to_string()))?;
        Ok(Self {
            job_instance_id,
            step_name: step_name.to_string(),
            kind,
        })
    }
}

impl fmt::Display for CheckpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.job_instance_id, self.step_name, self.kind.as_str())
    }
}

// ============================================================================
// SECTION: Checkpoint Pair
// ============================================================================

/// Reader and writer restart tokens for one (instance, step).
///
/// # Invariants
/// - `None` is a stored "null token", distinct from the pair not existing.
/// - Token bytes are opaque and returned unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointPair {
    /// Reader restart token.
    pub reader: Option<Vec<u8>>,
    /// Writer restart token.
    pub writer: Option<Vec<u8>>,
}

impl CheckpointPair {
    /// Creates a pair with both tokens null.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            reader: None,
            writer: None,
        }
    }

    /// Creates a pair from explicit tokens.
    #[must_use]
    pub const fn new(reader: Option<Vec<u8>>, writer: Option<Vec<u8>>) -> Self {
        Self {
            reader,
            writer,
        }
    }

    /// Returns the token for one side.
    #[must_use]
    pub fn token(&self, kind: CheckpointType) -> Option<&[u8]> {
        match kind {
            CheckpointType::Reader => self.reader.as_deref(),
            CheckpointType::Writer => self.writer.as_deref(),
        }
    }
}
