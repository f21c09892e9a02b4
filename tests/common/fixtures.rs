//! Test fixtures and node setup utilities

use seqlog::client::{ClientConfig, LogClient};
use seqlog::management::{ManagementConfig, SequencerBootstrapper};
use seqlog::replication::{
    ChainReplicationProtocol, HoleFillPolicy, ImmediateHoleFill, InMemoryLogUnit,
    ReplicationProtocol,
};
use seqlog::sequencer::{Sequencer, SequencerConfig, SequencerHandle};
use seqlog::traits::{LogEntry, LogUnit};
use seqlog::types::{Epoch, StreamId};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Everything a single node runs, wired the way the binary wires it
pub struct TestNode {
    pub sequencer: SequencerHandle,
    pub units: Vec<Arc<InMemoryLogUnit>>,
    pub protocol: Arc<ChainReplicationProtocol>,
    pub client: LogClient,
    pub bootstrapper: SequencerBootstrapper,
}

impl TestNode {
    /// Another client sharing this node's sequencer and chain
    pub fn new_client(&self) -> LogClient {
        LogClient::new(
            Arc::new(self.sequencer.clone()),
            self.protocol.clone(),
            ClientConfig::default(),
            Epoch::new(0),
        )
    }
}

/// Node with a single log unit that hole-fills on first sight
pub fn test_node() -> TestNode {
    test_node_with(1, Arc::new(ImmediateHoleFill))
}

/// Node with `chain_length` log units and the given hole-fill policy
pub fn test_node_with(chain_length: usize, policy: Arc<dyn HoleFillPolicy>) -> TestNode {
    let (sequencer, _task) = Sequencer::spawn(SequencerConfig::default());

    let units: Vec<Arc<InMemoryLogUnit>> = (0..chain_length)
        .map(|i| Arc::new(InMemoryLogUnit::new(format!("unit-{i}"))))
        .collect();
    let chain = units
        .iter()
        .map(|unit| Arc::clone(unit) as Arc<dyn LogUnit>)
        .collect();
    let protocol = Arc::new(
        ChainReplicationProtocol::new(chain, policy).expect("Failed to build replication chain"),
    );

    let client = LogClient::new(
        Arc::new(sequencer.clone()),
        protocol.clone(),
        ClientConfig::default(),
        Epoch::new(0),
    );
    let bootstrapper = SequencerBootstrapper::new(
        Arc::new(sequencer.clone()),
        protocol.clone() as Arc<dyn ReplicationProtocol>,
        ManagementConfig::default(),
    );

    TestNode {
        sequencer,
        units,
        protocol,
        client,
        bootstrapper,
    }
}

/// Entry belonging to `streams` with no backpointers
pub fn entry_for(streams: &[StreamId], payload: &'static [u8]) -> LogEntry {
    LogEntry {
        streams: streams.iter().copied().collect::<BTreeSet<_>>(),
        backpointers: BTreeMap::new(),
        payload: payload.into(),
    }
}

/// Named stream ids, stable across runs
pub fn streams(names: &[&str]) -> Vec<StreamId> {
    names.iter().map(|name| StreamId::from_name(name)).collect()
}
