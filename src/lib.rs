//! seqlog library exports
//!
//! Sequencer and replication core of a distributed shared log: epoch-scoped
//! position allocation with per-stream backpointers, and write-once log
//! positions resolved by hole filling.

pub mod client;
pub mod config;
pub mod error;
pub mod management;
pub mod replication;
pub mod sequencer;
pub mod traits;
pub mod types;

// Re-exports
pub use client::LogClient;
pub use config::Config;
pub use error::{ServerError, ServerResult};
pub use replication::{ChainReplicationProtocol, HoleFillPolicy, ReplicationProtocol};
pub use sequencer::{Sequencer, SequencerHandle};
pub use traits::{LogData, LogEntry, LogUnit, TokenService};
pub use types::{Epoch, LogPosition, StreamId};
