// crates/batch-ledger-core/src/model/time.rs
// ============================================================================
// Module: Batch Ledger Time Model
// Description: Millisecond timestamps recorded on executions and statuses.
// Purpose: Provide one explicit time representation for every ledger column.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Ledger timestamps are unix epoch milliseconds supplied by the caller. The
//! store never stamps rows with wall-clock time on its own; [`Timestamp::now`]
//! exists for drivers and tools that need a current value to pass in.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Unix epoch milliseconds.
///
/// # Invariants
/// - Values are caller supplied; monotonicity is a caller responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        Self(i64::try_from(now.as_millis()).unwrap_or(i64::MAX))
    }

    /// Formats the timestamp as RFC 3339 in UTC.
    ///
    /// Returns `None` when the value falls outside the representable range.
    #[must_use]
    pub fn to_rfc3339(self) -> Option<String> {
        let nanos = i128::from(self.0) * 1_000_000;
        let moment = OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()?;
        moment.format(&Rfc3339).ok()
    }

    /// Parses an RFC 3339 string into a millisecond timestamp.
    ///
    /// Sub-millisecond precision is truncated.
    #[must_use]
    pub fn parse_rfc3339(value: &str) -> Option<Self> {
        let parsed = OffsetDateTime::parse(value, &Rfc3339).ok()?;
        let millis = parsed.unix_timestamp_nanos() / 1_000_000;
        i64::try_from(millis).ok().map(Self)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
