//! Boundary with the reconfiguration / failure-detection layer
//!
//! Layout changes are decided elsewhere. This side only reacts: it reseeds the
//! sequencer for the new epoch and answers ack or nack.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{Epoch, LogPosition, StreamId};

/// An epoch-incrementing layout change that requires a sequencer reset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutChange {
    /// Epoch of the new layout
    pub epoch: Epoch,

    /// Rebuild tails by replaying the log from `rebuild_start`
    pub full_reset: bool,

    /// Where a replay starts (ignored unless `full_reset`)
    pub rebuild_start: LogPosition,

    /// Global tail known to the reconfiguration layer
    pub global_tail_hint: LogPosition,

    /// Stream tails known to the reconfiguration layer
    pub stream_tail_hints: BTreeMap<StreamId, Option<LogPosition>>,
}

/// Reply to a layout change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BootstrapReply {
    Ack,
    Nack(String),
}

impl BootstrapReply {
    pub fn is_ack(&self) -> bool {
        matches!(self, BootstrapReply::Ack)
    }
}

/// Receiver of layout changes
#[async_trait]
pub trait LayoutChangeHandler: Send + Sync + 'static {
    async fn handle_layout_change(&self, change: LayoutChange) -> BootstrapReply;
}
