//! Token service trait and its request/response types

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::SequencerResult;
use crate::types::{Epoch, LogPosition, StreamId};

/// Request for `count` consecutive positions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequest {
    /// Epoch the client computed this request under
    pub epoch: Epoch,

    /// Number of positions; 0 queries the current tails
    pub count: u64,

    /// Streams this append targets (empty = log-wide only)
    pub streams: BTreeSet<StreamId>,
}

impl TokenRequest {
    pub fn new(epoch: Epoch, count: u64, streams: impl IntoIterator<Item = StreamId>) -> Self {
        Self {
            epoch,
            count,
            streams: streams.into_iter().collect(),
        }
    }

    /// Tail query that allocates nothing
    pub fn query(epoch: Epoch, streams: impl IntoIterator<Item = StreamId>) -> Self {
        Self::new(epoch, 0, streams)
    }

    pub fn is_query(&self) -> bool {
        self.count == 0
    }
}

/// Allocated run of positions (or current tails, for a query)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Epoch the response was computed under
    pub epoch: Epoch,

    /// First position of the run; for a query, the current global tail
    pub first_position: LogPosition,

    /// Length of the run (0 for a query)
    pub count: u64,

    /// Prior tail of each requested stream; for a query, its current tail
    pub backpointers: BTreeMap<StreamId, Option<LogPosition>>,
}

impl TokenResponse {
    /// Last position of the run, `None` for a query
    pub fn last_position(&self) -> Option<LogPosition> {
        if self.count == 0 {
            return None;
        }
        self.first_position.checked_add(self.count - 1)
    }

    /// Every position in the run
    pub fn positions(&self) -> impl Iterator<Item = LogPosition> {
        let first = self.first_position.value();
        (first..first.saturating_add(self.count)).map(LogPosition::new)
    }

    /// Backpointer (or current tail, for a query) of `stream`
    pub fn backpointer(&self, stream: &StreamId) -> Option<LogPosition> {
        self.backpointers.get(stream).copied().flatten()
    }
}

/// Reseeds the sequencer after a layout change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapRequest {
    /// Epoch the sequencer moves to
    pub new_epoch: Epoch,

    /// Next unallocated position as known by the caller
    pub global_tail_hint: LogPosition,

    /// Last known position per stream
    pub stream_tail_hints: BTreeMap<StreamId, Option<LogPosition>>,

    /// Position the log was replayed from to compute the hints
    pub rebuild_start: LogPosition,

    /// Discard current state and take the hints as-is
    pub full_reset: bool,
}

impl BootstrapRequest {
    /// Epoch bump that merges the given hints into the current state
    pub fn merge(
        new_epoch: Epoch,
        global_tail_hint: LogPosition,
        stream_tail_hints: BTreeMap<StreamId, Option<LogPosition>>,
    ) -> Self {
        Self {
            new_epoch,
            global_tail_hint,
            stream_tail_hints,
            rebuild_start: LogPosition::ZERO,
            full_reset: false,
        }
    }
}

/// How a bootstrap was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BootstrapOutcome {
    /// State was reseeded
    Applied,

    /// Identical to the bootstrap already applied for this epoch; nothing changed
    AlreadyApplied,
}

/// Sequencer counters and current position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencerMetrics {
    pub epoch: Epoch,
    pub global_tail: LogPosition,
    pub stream_count: usize,
    pub tokens_issued: u64,
    pub queries_served: u64,
    /// Token requests and bootstraps refused for an older epoch
    pub stale_rejections: u64,
    pub bootstraps: u64,
    pub last_bootstrap_at: Option<DateTime<Utc>>,
}

/// Client of a sequencer
///
/// Implemented by `SequencerHandle`; consumed by the append path and by the
/// management-side bootstrapper.
#[async_trait]
pub trait TokenService: Send + Sync + 'static {
    /// Allocate positions, or query tails when `request.count == 0`
    async fn allocate(&self, request: TokenRequest) -> SequencerResult<TokenResponse>;

    /// Move the sequencer to a new epoch and reseed its tails
    async fn bootstrap(&self, request: BootstrapRequest) -> SequencerResult<BootstrapOutcome>;

    /// Current counters
    async fn metrics(&self) -> SequencerResult<SequencerMetrics>;
}
