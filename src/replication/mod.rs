//! Replication module - read/write of log positions with hole filling
//!
//! - Writers commit with write-if-empty; losers see `WriteConflict`
//! - Readers wait per `HoleFillPolicy`, then hole-fill and re-read
//! - A committed position never changes, whoever committed it

mod chain;
mod config;
mod memory;
mod policy;
mod protocol;

pub use chain::ChainReplicationProtocol;
pub use config::ReplicationConfig;
pub use memory::InMemoryLogUnit;
pub use policy::{
    BackoffHoleFill, FixedRetryHoleFill, HoleFillPolicy, HoleFillPolicyKind, ImmediateHoleFill,
};
pub use protocol::ReplicationProtocol;
