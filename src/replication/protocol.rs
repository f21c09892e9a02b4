//! Replication protocol: resolve a position to exactly one durable value

use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::debug;

use super::policy::HoleFillPolicy;
use crate::error::{PeekError, ReplicationError, ReplicationResult};
use crate::traits::{LogData, LogEntry, SlotState};
use crate::types::LogPosition;

/// Read and write access to log positions
///
/// Implementations provide `peek`, a conditional `write` and `hole_fill`; the
/// provided `read` drives the hole-fill policy on top of them. Once a value is
/// committed at a position it never changes, whichever path committed it.
#[async_trait]
pub trait ReplicationProtocol: Send + Sync + 'static {
    /// Policy deciding how long `read` waits before hole-filling
    fn hole_fill_policy(&self) -> &dyn HoleFillPolicy;

    /// Non-blocking probe of the position's state
    async fn peek(&self, position: LogPosition) -> ReplicationResult<SlotState>;

    /// Commit `entry` at `position` if nothing was written there yet
    ///
    /// Returns `WriteConflict` if another value (data or hole) won the position.
    async fn write(&self, position: LogPosition, entry: LogEntry) -> ReplicationResult<()>;

    /// Force the position to resolve
    ///
    /// Writes the hole sentinel with the same conditional write real writers
    /// use. When this returns, either the hole or a racing writer's value is
    /// committed; callers must read the position to find out which.
    async fn hole_fill(&self, position: LogPosition) -> ReplicationResult<()>;

    /// Resolve `position` to its committed value, hole-filling if the policy gives up
    ///
    /// The result may be a hole; check `LogData::is_hole` before treating it as data.
    async fn read(&self, position: LogPosition) -> ReplicationResult<LogData> {
        let policy = self.hole_fill_policy();
        let result = policy
            .peek_until_hole_fill_required(position, |p| self.peek(p))
            .await;

        match result {
            Ok(data) => Ok(data),
            Err(PeekError::Replication(e)) => Err(e),
            Err(PeekError::HoleFillRequired(signal)) => {
                debug!(
                    position = %position,
                    attempts = signal.attempts,
                    elapsed_ms = signal.elapsed.as_millis() as u64,
                    "HoleFill due to unresolved position"
                );
                self.hole_fill(position).await?;
                self.peek(position)
                    .await?
                    .into_committed()
                    .ok_or(ReplicationError::Unresolved { position })
            }
        }
    }

    /// Resolve several positions concurrently
    async fn read_many(
        &self,
        positions: &[LogPosition],
    ) -> ReplicationResult<BTreeMap<LogPosition, LogData>> {
        let reads = positions.iter().map(|position| async move {
            self.read(*position).await.map(|data| (*position, data))
        });
        let resolved = futures::future::try_join_all(reads).await?;
        Ok(resolved.into_iter().collect())
    }
}
