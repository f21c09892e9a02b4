//! Log unit boundary: a single durable slot per position with write-if-empty semantics

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::ReplicationResult;
use crate::traits::sequencer::TokenResponse;
use crate::types::{LogPosition, StreamId};

/// A real append written by a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Streams this entry belongs to (empty = log-wide only)
    pub streams: BTreeSet<StreamId>,

    /// Previous position of each stream, copied from the token
    pub backpointers: BTreeMap<StreamId, Option<LogPosition>>,

    /// Opaque payload
    pub payload: Bytes,
}

impl LogEntry {
    /// Log-wide entry with no stream membership
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            streams: BTreeSet::new(),
            backpointers: BTreeMap::new(),
            payload: payload.into(),
        }
    }

    /// Entry for the streams and backpointers handed out with `token`
    pub fn for_token(token: &TokenResponse, payload: impl Into<Bytes>) -> Self {
        Self {
            streams: token.backpointers.keys().copied().collect(),
            backpointers: token.backpointers.clone(),
            payload: payload.into(),
        }
    }

    /// Previous entry of `stream`, if this entry belongs to it
    pub fn backpointer(&self, stream: &StreamId) -> Option<LogPosition> {
        self.backpointers.get(stream).copied().flatten()
    }

    pub fn belongs_to(&self, stream: &StreamId) -> bool {
        self.streams.contains(stream)
    }
}

/// Value held at a log position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogData {
    /// Client data
    Entry(LogEntry),

    /// Hole-fill sentinel: the position is resolved but holds no data
    Hole,
}

impl LogData {
    pub fn is_hole(&self) -> bool {
        matches!(self, LogData::Hole)
    }

    pub fn as_entry(&self) -> Option<&LogEntry> {
        match self {
            LogData::Entry(entry) => Some(entry),
            LogData::Hole => None,
        }
    }

    pub fn into_entry(self) -> Option<LogEntry> {
        match self {
            LogData::Entry(entry) => Some(entry),
            LogData::Hole => None,
        }
    }
}

impl From<LogEntry> for LogData {
    fn from(entry: LogEntry) -> Self {
        LogData::Entry(entry)
    }
}

/// Durability state of a position as seen by the replication protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotState {
    /// Nothing written anywhere
    Empty,

    /// Written somewhere, not yet committed
    Pending,

    /// Committed; this value is permanent
    Committed(LogData),
}

impl SlotState {
    pub fn into_committed(self) -> Option<LogData> {
        match self {
            SlotState::Committed(data) => Some(data),
            SlotState::Empty | SlotState::Pending => None,
        }
    }
}

/// Result of a conditional write at one log unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Slot was empty and now holds the written value
    Written,

    /// Slot already held a value; it is returned unchanged
    Conflict(LogData),
}

/// A storage/replica unit holding one slot per position
///
/// `write` must be atomic write-if-empty: once a slot holds a value it never
/// changes. Real writes and hole-fill sentinels go through the same call.
#[async_trait]
pub trait LogUnit: Send + Sync + 'static {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Non-blocking probe of the slot at `position`
    async fn peek(&self, position: LogPosition) -> ReplicationResult<Option<LogData>>;

    /// Write `data` at `position` only if the slot is empty
    async fn write(&self, position: LogPosition, data: LogData) -> ReplicationResult<WriteOutcome>;
}
