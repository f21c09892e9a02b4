//! Token allocation state: global tail, stream tails and the current epoch
//!
//! `TokenState` is plain data with no locking. The sequencer task owns it and
//! feeds it one command at a time, so every allocation and bootstrap is
//! applied in a single total order.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

use crate::error::{SequencerError, SequencerResult};
use crate::traits::{
    BootstrapOutcome, BootstrapRequest, SequencerMetrics, TokenRequest, TokenResponse,
};
use crate::types::{Epoch, LogPosition, StreamId};

/// Tails and counters of one sequencer
#[derive(Debug)]
pub struct TokenState {
    epoch: Epoch,

    /// Next unallocated position
    global_tail: LogPosition,

    /// Last position allocated to each stream
    stream_tails: HashMap<StreamId, LogPosition>,

    /// Last bootstrap applied, for idempotent replays
    last_bootstrap: Option<BootstrapRequest>,
    last_bootstrap_at: Option<DateTime<Utc>>,

    max_tokens_per_request: u64,

    tokens_issued: u64,
    queries_served: u64,
    stale_rejections: u64,
    bootstraps: u64,
}

impl TokenState {
    /// Empty state at `epoch`
    pub fn new(epoch: Epoch, max_tokens_per_request: u64) -> Self {
        Self {
            epoch,
            global_tail: LogPosition::ZERO,
            stream_tails: HashMap::new(),
            last_bootstrap: None,
            last_bootstrap_at: None,
            max_tokens_per_request,
            tokens_issued: 0,
            queries_served: 0,
            stale_rejections: 0,
            bootstraps: 0,
        }
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn global_tail(&self) -> LogPosition {
        self.global_tail
    }

    pub fn stream_tail(&self, stream: &StreamId) -> Option<LogPosition> {
        self.stream_tails.get(stream).copied()
    }

    /// Allocate `request.count` positions, or answer a tail query
    pub fn allocate(&mut self, request: &TokenRequest) -> SequencerResult<TokenResponse> {
        self.check_epoch(request.epoch)?;

        if request.count > self.max_tokens_per_request {
            return Err(SequencerError::InvalidArgument(format!(
                "requested {} tokens, at most {} per request",
                request.count, self.max_tokens_per_request
            )));
        }

        if request.is_query() {
            self.queries_served += 1;
            let tails = request
                .streams
                .iter()
                .map(|stream| (*stream, self.stream_tail(stream)))
                .collect();
            return Ok(self.response(self.global_tail, 0, tails));
        }

        let first = self.global_tail;
        let end = first
            .checked_add(request.count)
            .ok_or(SequencerError::TailOverflow {
                global_tail: first,
                count: request.count,
            })?;
        let last = end.prev().ok_or_else(|| {
            SequencerError::Internal(format!("empty run allocated at {first}"))
        })?;

        // Stream tails point at the run's last position so the next append to
        // the stream chains past the whole run.
        let backpointers = request
            .streams
            .iter()
            .map(|stream| (*stream, self.stream_tails.insert(*stream, last)))
            .collect();

        self.global_tail = end;
        self.tokens_issued = self.tokens_issued.saturating_add(request.count);

        Ok(self.response(first, request.count, backpointers))
    }

    /// Move to `request.new_epoch` and reseed tails
    ///
    /// Validation happens before any mutation, so a rejected bootstrap leaves
    /// the state untouched.
    pub fn bootstrap(&mut self, request: &BootstrapRequest) -> SequencerResult<BootstrapOutcome> {
        self.check_epoch(request.new_epoch)?;

        if request.new_epoch == self.epoch && self.last_bootstrap.as_ref() == Some(request) {
            return Ok(BootstrapOutcome::AlreadyApplied);
        }

        if request.full_reset {
            self.validate_full_reset(request)?;
            self.stream_tails = request
                .stream_tail_hints
                .iter()
                .filter_map(|(stream, tail)| tail.map(|tail| (*stream, tail)))
                .collect();
            self.global_tail = request.global_tail_hint;
        } else {
            let global_tail = self.merged_global_tail(request)?;
            for (stream, hint) in &request.stream_tail_hints {
                let Some(hint) = *hint else { continue };
                let tail = self.stream_tails.entry(*stream).or_insert(hint);
                *tail = (*tail).max(hint);
            }
            self.global_tail = global_tail;
        }

        self.epoch = request.new_epoch;
        self.last_bootstrap = Some(request.clone());
        self.last_bootstrap_at = Some(Utc::now());
        self.bootstraps += 1;

        Ok(BootstrapOutcome::Applied)
    }

    pub fn metrics(&self) -> SequencerMetrics {
        SequencerMetrics {
            epoch: self.epoch,
            global_tail: self.global_tail,
            stream_count: self.stream_tails.len(),
            tokens_issued: self.tokens_issued,
            queries_served: self.queries_served,
            stale_rejections: self.stale_rejections,
            bootstraps: self.bootstraps,
            last_bootstrap_at: self.last_bootstrap_at,
        }
    }

    fn check_epoch(&mut self, requested: Epoch) -> SequencerResult<()> {
        if requested < self.epoch {
            self.stale_rejections += 1;
            return Err(SequencerError::StaleEpoch {
                requested,
                current: self.epoch,
            });
        }
        Ok(())
    }

    fn response(
        &self,
        first_position: LogPosition,
        count: u64,
        backpointers: BTreeMap<StreamId, Option<LogPosition>>,
    ) -> TokenResponse {
        TokenResponse {
            epoch: self.epoch,
            first_position,
            count,
            backpointers,
        }
    }

    /// Global tail after a merge: never lower than now, never at or below a stream tail
    fn merged_global_tail(&self, request: &BootstrapRequest) -> SequencerResult<LogPosition> {
        let mut global_tail = self.global_tail.max(request.global_tail_hint);
        for hint in request.stream_tail_hints.values().flatten() {
            let after = hint.next().ok_or(SequencerError::TailOverflow {
                global_tail: *hint,
                count: 1,
            })?;
            global_tail = global_tail.max(after);
        }
        Ok(global_tail)
    }

    fn validate_full_reset(&self, request: &BootstrapRequest) -> SequencerResult<()> {
        let untouched = self.last_bootstrap.is_none() && self.tokens_issued == 0;
        if request.new_epoch == self.epoch && !untouched {
            return Err(SequencerError::InvalidArgument(format!(
                "full reset must advance the epoch past {}",
                self.epoch
            )));
        }

        if request.global_tail_hint < request.rebuild_start {
            return Err(SequencerError::InvalidArgument(format!(
                "global tail hint {} is before rebuild start {}",
                request.global_tail_hint, request.rebuild_start
            )));
        }

        for (stream, tail) in &request.stream_tail_hints {
            if let Some(tail) = tail {
                if *tail >= request.global_tail_hint {
                    return Err(SequencerError::InvalidArgument(format!(
                        "stream {stream} tail {tail} is not below global tail hint {}",
                        request.global_tail_hint
                    )));
                }
            }
        }

        Ok(())
    }
}
