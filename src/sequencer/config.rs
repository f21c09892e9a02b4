//! Sequencer configuration

use crate::types::Epoch;

/// Sequencer configuration
#[derive(Debug, Clone)]
pub struct SequencerConfig {
    /// Bounded channel capacity (backpressure threshold)
    pub buffer_size: usize,

    /// Epoch the sequencer starts in before any bootstrap
    pub initial_epoch: Epoch,

    /// Largest run a single request may allocate
    pub max_tokens_per_request: u64,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            buffer_size: 10_000,
            initial_epoch: Epoch::new(0),
            max_tokens_per_request: 1_000_000,
        }
    }
}

impl SequencerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            buffer_size: std::env::var("SEQLOG_SEQUENCER_BUFFER_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|size| *size > 0)
                .unwrap_or(10_000),
            initial_epoch: std::env::var("SEQLOG_INITIAL_EPOCH")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Epoch::new)
                .unwrap_or(Epoch::new(0)),
            max_tokens_per_request: std::env::var("SEQLOG_MAX_TOKENS_PER_REQUEST")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1_000_000),
        }
    }
}
