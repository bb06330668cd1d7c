// crates/batch-ledger-core/src/model/partition.rs
// ============================================================================
// Module: Batch Ledger Partition Names
// Description: Naming scheme for synthetic partition job instances.
// Purpose: Build, parse, and match `:<root>:<step>:<index>` instance names.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Each partition of a partitioned step runs as its own job instance named
//! `:<rootJobInstanceId>:<stepName>:<partitionIndex>`. The root id and index
//! are all digits, so splitting after the leading colon on the first and last
//! colon recovers the step name exactly. Stores that prefilter with a pattern
//! predicate use [`PartitionInstanceName::like_pattern`] and then confirm
//! every candidate with [`PartitionInstanceName::belongs_to`], so step names
//! containing `:`, `%`, or `_` never match a sibling step.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::model::identifiers::JobInstanceId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Escape character used by [`escape_like_pattern`].
pub const LIKE_ESCAPE: char = '\\';

// ============================================================================
// SECTION: Partition Names
// ============================================================================

/// Parsed name of a synthetic partition job instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionInstanceName {
    /// Job instance that owns the partitioned step.
    pub root: JobInstanceId,
    /// Partitioned step name.
    pub step_name: String,
    /// Zero-based partition index.
    pub index: u32,
}

impl PartitionInstanceName {
    /// Creates a partition name.
    #[must_use]
    pub fn new(root: JobInstanceId, step_name: &str, index: u32) -> Self {
        Self {
            root,
            step_name: step_name.to_string(),
            index,
        }
    }

    /// Returns the literal prefix shared by every partition of a step.
    #[must_use]
    pub fn prefix(root: JobInstanceId, step_name: &str) -> String {
        format!(":{root}:{step_name}:")
    }

    /// Returns a `LIKE` pattern (escape character [`LIKE_ESCAPE`]) matching
    /// every partition of a step, and possibly some false candidates.
    #[must_use]
    pub fn like_pattern(root: JobInstanceId, step_name: &str) -> String {
        let mut pattern = escape_like_pattern(&Self::prefix(root, step_name));
        pattern.push('%');
        pattern
    }

    /// Parses an instance name; returns `None` for non-partition names.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let rest = name.strip_prefix(':')?;
        let (root, rest) = rest.split_once(':')?;
        let (step_name, index) = rest.rsplit_once(':')?;
        let root = parse_digits(root).and_then(JobInstanceId::from_raw)?;
        let index = u32::try_from(parse_digits(index)?).ok()?;
        Some(Self {
            root,
            step_name: step_name.to_string(),
            index,
        })
    }

    /// Returns true when `name` is exactly a partition of `(root, step_name)`.
    #[must_use]
    pub fn belongs_to(name: &str, root: JobInstanceId, step_name: &str) -> bool {
        Self::parse(name).is_some_and(|parsed| parsed.root == root && parsed.step_name == step_name)
    }
}

impl fmt::Display for PartitionInstanceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}:{}:{}", self.root, self.step_name, self.index)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Escapes `%`, `_`, and the escape character itself for a `LIKE` predicate.
#[must_use]
pub fn escape_like_pattern(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch == '%' || ch == '_' || ch == LIKE_ESCAPE {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(ch);
    }
    escaped
}

/// Parses a non-empty run of ASCII digits.
fn parse_digits(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
