//! Tail recovery: recompute sequencer tails by replaying the log

use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::error::ReplicationResult;
use crate::replication::ReplicationProtocol;
use crate::traits::LogData;
use crate::types::{LogPosition, StreamId};

/// Tails found by a replay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TailSnapshot {
    /// Next unallocated position
    pub global_tail: LogPosition,

    /// Last position of every stream seen (or hinted)
    pub stream_tails: BTreeMap<StreamId, Option<LogPosition>>,

    /// Entries read during the replay
    pub entries: u64,

    /// Holes read (or filled) during the replay
    pub holes: u64,
}

/// Replay `[rebuild_start, log_tail)` and derive stream tails
///
/// `known_tails` seeds streams whose last entry may sit before `rebuild_start`.
/// A stream seen in the replayed range takes its last replayed position, even
/// when its hint is higher. Unwritten positions in the range
/// are hole-filled by the reads, so the replayed prefix is stable afterwards.
pub async fn rebuild_tails(
    protocol: &dyn ReplicationProtocol,
    rebuild_start: LogPosition,
    log_tail: LogPosition,
    known_tails: &BTreeMap<StreamId, Option<LogPosition>>,
    batch_size: usize,
) -> ReplicationResult<TailSnapshot> {
    let mut snapshot = TailSnapshot {
        global_tail: log_tail,
        stream_tails: known_tails.clone(),
        ..Default::default()
    };

    let batch_size = batch_size.max(1) as u64;
    let mut next = rebuild_start.value();
    let end = log_tail.value();

    while next < end {
        let batch_end = next.saturating_add(batch_size).min(end);
        let positions: Vec<LogPosition> = (next..batch_end).map(LogPosition::new).collect();

        // BTreeMap iterates in position order, so later entries overwrite earlier tails
        for (position, data) in protocol.read_many(&positions).await? {
            match data {
                LogData::Hole => snapshot.holes += 1,
                LogData::Entry(entry) => {
                    snapshot.entries += 1;
                    for stream in &entry.streams {
                        snapshot.stream_tails.insert(*stream, Some(position));
                    }
                }
            }
        }

        debug!(from = next, to = batch_end, "Replayed log batch");
        next = batch_end;
    }

    info!(
        rebuild_start = %rebuild_start,
        global_tail = %snapshot.global_tail,
        streams = snapshot.stream_tails.len(),
        entries = snapshot.entries,
        holes = snapshot.holes,
        "Rebuilt sequencer tails from log"
    );

    Ok(snapshot)
}
