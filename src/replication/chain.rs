//! Chain replication over an ordered list of log units
//!
//! Writes go head to tail. The head's conditional write decides which value
//! wins a position; the rest of the chain only copies it. A position is
//! committed once the tail holds it.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

use super::policy::HoleFillPolicy;
use super::protocol::ReplicationProtocol;
use crate::error::{ReplicationError, ReplicationResult};
use crate::traits::{LogData, LogEntry, LogUnit, SlotState, WriteOutcome};
use crate::types::LogPosition;

/// Replication protocol writing every position to each unit of a chain in order
pub struct ChainReplicationProtocol {
    /// Head first, tail last; never empty
    chain: Vec<Arc<dyn LogUnit>>,
    policy: Arc<dyn HoleFillPolicy>,
}

impl ChainReplicationProtocol {
    pub fn new(
        chain: Vec<Arc<dyn LogUnit>>,
        policy: Arc<dyn HoleFillPolicy>,
    ) -> ReplicationResult<Self> {
        if chain.is_empty() {
            return Err(ReplicationError::InvalidArgument(
                "replication chain needs at least one log unit".into(),
            ));
        }
        Ok(Self { chain, policy })
    }

    pub fn chain_length(&self) -> usize {
        self.chain.len()
    }

    fn head(&self) -> &Arc<dyn LogUnit> {
        &self.chain[0]
    }

    fn tail(&self) -> &Arc<dyn LogUnit> {
        &self.chain[self.chain.len() - 1]
    }

    /// Copy the value the head accepted to every unit after it
    ///
    /// A unit that already holds the same value is fine (an earlier, partial
    /// propagation); a different value means the chain diverged.
    async fn propagate(&self, position: LogPosition, data: &LogData) -> ReplicationResult<()> {
        for unit in self.chain.iter().skip(1) {
            match unit.write(position, data.clone()).await? {
                WriteOutcome::Written => {}
                WriteOutcome::Conflict(existing) if existing == *data => {}
                WriteOutcome::Conflict(existing) => {
                    error!(
                        position = %position,
                        unit = unit.name(),
                        existing_hole = existing.is_hole(),
                        head_hole = data.is_hole(),
                        "Replica diverged from chain head"
                    );
                    return Err(ReplicationError::Inconsistent {
                        position,
                        detail: format!("log unit {} holds a different value", unit.name()),
                    });
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ChainReplicationProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let units: Vec<&str> = self.chain.iter().map(|unit| unit.name()).collect();
        f.debug_struct("ChainReplicationProtocol")
            .field("chain", &units)
            .field("policy", &self.policy)
            .finish()
    }
}

#[async_trait]
impl ReplicationProtocol for ChainReplicationProtocol {
    fn hole_fill_policy(&self) -> &dyn HoleFillPolicy {
        self.policy.as_ref()
    }

    async fn peek(&self, position: LogPosition) -> ReplicationResult<SlotState> {
        if let Some(data) = self.tail().peek(position).await? {
            return Ok(SlotState::Committed(data));
        }
        if self.chain.len() == 1 {
            return Ok(SlotState::Empty);
        }

        // Every write starts at the head, so nothing downstream without it
        match self.head().peek(position).await? {
            Some(_) => Ok(SlotState::Pending),
            None => Ok(SlotState::Empty),
        }
    }

    async fn write(&self, position: LogPosition, entry: LogEntry) -> ReplicationResult<()> {
        let data = LogData::Entry(entry);

        match self.head().write(position, data.clone()).await? {
            WriteOutcome::Written => {}
            // Any value already at the head owns the position, even an identical one
            WriteOutcome::Conflict(existing) => {
                debug!(
                    position = %position,
                    winner_is_hole = existing.is_hole(),
                    "Write lost the race for position"
                );
                return Err(ReplicationError::WriteConflict { position });
            }
        }

        self.propagate(position, &data).await
    }

    async fn hole_fill(&self, position: LogPosition) -> ReplicationResult<()> {
        let adopted = match self.head().write(position, LogData::Hole).await? {
            WriteOutcome::Written => {
                debug!(position = %position, "Hole filled");
                LogData::Hole
            }
            WriteOutcome::Conflict(existing) => {
                debug!(
                    position = %position,
                    existing_hole = existing.is_hole(),
                    "Hole fill found a value at head, repairing chain"
                );
                existing
            }
        };

        self.propagate(position, &adopted).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replication::memory::InMemoryLogUnit;
    use crate::replication::policy::ImmediateHoleFill;

    fn chain_of(n: usize) -> (Vec<Arc<InMemoryLogUnit>>, ChainReplicationProtocol) {
        let units: Vec<Arc<InMemoryLogUnit>> = (0..n)
            .map(|i| Arc::new(InMemoryLogUnit::new(format!("unit-{i}"))))
            .collect();
        let chain = units
            .iter()
            .map(|unit| Arc::clone(unit) as Arc<dyn LogUnit>)
            .collect();
        let protocol = ChainReplicationProtocol::new(chain, Arc::new(ImmediateHoleFill)).unwrap();
        (units, protocol)
    }

    fn entry(byte: u8) -> LogEntry {
        LogEntry::new(vec![byte])
    }

    #[test]
    fn test_empty_chain_rejected() {
        let err = ChainReplicationProtocol::new(vec![], Arc::new(ImmediateHoleFill)).unwrap_err();
        assert!(matches!(err, ReplicationError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_write_reaches_every_unit() {
        let (units, protocol) = chain_of(3);
        let position = LogPosition::new(0);

        protocol.write(position, entry(1)).await.unwrap();

        for unit in &units {
            assert_eq!(
                unit.peek(position).await.unwrap(),
                Some(LogData::Entry(entry(1)))
            );
        }
        assert_eq!(
            protocol.peek(position).await.unwrap(),
            SlotState::Committed(LogData::Entry(entry(1)))
        );
    }

    #[tokio::test]
    async fn test_second_write_conflicts() {
        let (_units, protocol) = chain_of(2);
        let position = LogPosition::new(4);

        protocol.write(position, entry(1)).await.unwrap();
        let err = protocol.write(position, entry(2)).await.unwrap_err();

        assert_eq!(err, ReplicationError::WriteConflict { position });
        assert_eq!(
            protocol.read(position).await.unwrap(),
            LogData::Entry(entry(1))
        );
    }

    #[tokio::test]
    async fn test_identical_second_write_conflicts() {
        let (units, protocol) = chain_of(2);
        let position = LogPosition::new(4);

        protocol.write(position, entry(1)).await.unwrap();
        let err = protocol.write(position, entry(1)).await.unwrap_err();

        assert_eq!(err, ReplicationError::WriteConflict { position });
        assert_eq!(
            units[1].peek(position).await.unwrap(),
            Some(LogData::Entry(entry(1)))
        );
    }

    #[tokio::test]
    async fn test_hole_fill_finishes_identical_partial_write() {
        let (units, protocol) = chain_of(3);
        let position = LogPosition::new(8);
        let data = LogData::Entry(entry(6));

        // Head and tail already hold the value; the middle was skipped
        units[0].write(position, data.clone()).await.unwrap();
        units[2].write(position, data.clone()).await.unwrap();

        protocol.hole_fill(position).await.unwrap();

        assert_eq!(units[1].peek(position).await.unwrap(), Some(data));
    }

    #[tokio::test]
    async fn test_head_only_write_is_pending() {
        let (units, protocol) = chain_of(3);
        let position = LogPosition::new(2);

        // Writer crashed after reaching the head
        units[0]
            .write(position, LogData::Entry(entry(5)))
            .await
            .unwrap();

        assert_eq!(protocol.peek(position).await.unwrap(), SlotState::Pending);
    }

    #[tokio::test]
    async fn test_hole_fill_repairs_partial_write() {
        let (units, protocol) = chain_of(3);
        let position = LogPosition::new(2);
        units[0]
            .write(position, LogData::Entry(entry(5)))
            .await
            .unwrap();

        let data = protocol.read(position).await.unwrap();

        assert_eq!(data, LogData::Entry(entry(5)));
        assert_eq!(
            units[2].peek(position).await.unwrap(),
            Some(LogData::Entry(entry(5)))
        );
    }

    #[tokio::test]
    async fn test_read_of_unwritten_position_fills_hole() {
        let (units, protocol) = chain_of(2);
        let position = LogPosition::new(7);

        let data = protocol.read(position).await.unwrap();
        assert!(data.is_hole());
        assert_eq!(units[1].peek(position).await.unwrap(), Some(LogData::Hole));

        let err = protocol.write(position, entry(1)).await.unwrap_err();
        assert_eq!(err, ReplicationError::WriteConflict { position });
        assert!(protocol.read(position).await.unwrap().is_hole());
    }

    #[tokio::test]
    async fn test_divergent_replica_is_inconsistent() {
        let (units, protocol) = chain_of(2);
        let position = LogPosition::new(1);
        units[1].write(position, LogData::Hole).await.unwrap();

        let err = protocol.write(position, entry(3)).await.unwrap_err();

        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_peek_propagates_network_error() {
        let (units, protocol) = chain_of(2);
        units[1].set_offline(true);

        let err = protocol.read(LogPosition::new(0)).await.unwrap_err();

        assert!(matches!(err, ReplicationError::Network(_)));
        assert!(units[0].is_empty());
    }

    #[tokio::test]
    async fn test_read_many_resolves_each_position() {
        let (_units, protocol) = chain_of(1);
        protocol.write(LogPosition::new(0), entry(1)).await.unwrap();
        protocol.write(LogPosition::new(2), entry(3)).await.unwrap();

        let positions = [LogPosition::new(0), LogPosition::new(1), LogPosition::new(2)];
        let resolved = protocol.read_many(&positions).await.unwrap();

        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[&LogPosition::new(0)], LogData::Entry(entry(1)));
        assert!(resolved[&LogPosition::new(1)].is_hole());
        assert_eq!(resolved[&LogPosition::new(2)], LogData::Entry(entry(3)));
    }
}
