//! Core identifiers shared by the sequencer and the replication layer

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A slot in the total order of the shared log
///
/// Positions are non-negative by construction. "No position" (an empty stream,
/// a tail hint of -1 on the wire) is modelled as `Option<LogPosition>::None`,
/// which orders below every position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogPosition(u64);

impl LogPosition {
    /// The first position of a fresh log
    pub const ZERO: LogPosition = LogPosition(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    /// Position `n` slots after this one, or `None` on overflow
    pub fn checked_add(self, n: u64) -> Option<LogPosition> {
        self.0.checked_add(n).map(LogPosition)
    }

    /// The position immediately before this one (`None` for position 0)
    pub fn prev(self) -> Option<LogPosition> {
        self.0.checked_sub(1).map(LogPosition)
    }

    pub fn next(self) -> Option<LogPosition> {
        self.checked_add(1)
    }
}

impl From<u64> for LogPosition {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for LogPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sequencer generation counter, bumped on every layout change
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Epoch(u64);

impl Epoch {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for Epoch {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a stream (a sub-sequence of the log)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(Uuid);

impl StreamId {
    /// Derive a stable stream id from a human-readable name
    ///
    /// The same name always maps to the same id, on every node.
    pub fn from_name(name: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
    }

    /// Random stream id
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
