//! Backward stream traversal over backpointers

use tracing::debug;

use super::append::LogClient;
use crate::error::ServerResult;
use crate::traits::{LogData, LogEntry};
use crate::types::{LogPosition, StreamId};

impl LogClient {
    /// Every entry of `stream`, oldest first
    ///
    /// Starts at the sequencer's tail for the stream and follows backpointers.
    /// Where the chain is broken (an allocated position ended up a hole), it
    /// falls back to scanning one position at a time until it finds the
    /// stream again.
    pub async fn read_stream(&self, stream: StreamId) -> ServerResult<Vec<(LogPosition, LogEntry)>> {
        let tails = self.tails([stream]).await?;
        let mut cursor = tails.backpointer(&stream);
        let mut entries = Vec::new();
        let mut scanned = 0u64;

        while let Some(position) = cursor {
            match self.protocol.read(position).await? {
                LogData::Entry(entry) if entry.belongs_to(&stream) => {
                    cursor = entry.backpointer(&stream);
                    entries.push((position, entry));
                }
                LogData::Entry(_) | LogData::Hole => {
                    scanned += 1;
                    cursor = position.prev();
                }
            }
        }

        debug!(
            stream = %stream,
            entries = entries.len(),
            scanned,
            "Read stream backward"
        );

        entries.reverse();
        Ok(entries)
    }
}
