//! Replication configuration

use std::sync::Arc;
use std::time::Duration;

use super::policy::{
    BackoffHoleFill, FixedRetryHoleFill, HoleFillPolicy, HoleFillPolicyKind, ImmediateHoleFill,
};

/// Replication configuration
#[derive(Debug, Clone)]
pub struct ReplicationConfig {
    /// Which hole-fill strategy readers use
    pub hole_fill_policy: HoleFillPolicyKind,

    /// Peeks before hole-filling (fixed policy)
    pub hole_fill_max_attempts: u32,

    /// Delay between peeks (fixed policy), first delay (backoff policy)
    pub hole_fill_delay_ms: u64,

    /// Largest single delay (backoff policy)
    pub hole_fill_max_delay_ms: u64,

    /// Total patience (backoff policy)
    pub hole_fill_max_elapsed_ms: u64,

    /// Number of log units each position is replicated to
    pub chain_length: usize,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            hole_fill_policy: HoleFillPolicyKind::Backoff,
            hole_fill_max_attempts: 10,
            hole_fill_delay_ms: 10,
            hole_fill_max_delay_ms: 100,
            hole_fill_max_elapsed_ms: 1_000,
            chain_length: 1,
        }
    }
}

impl ReplicationConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            hole_fill_policy: std::env::var("SEQLOG_HOLE_FILL_POLICY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(HoleFillPolicyKind::Backoff),
            hole_fill_max_attempts: std::env::var("SEQLOG_HOLE_FILL_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            hole_fill_delay_ms: std::env::var("SEQLOG_HOLE_FILL_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            hole_fill_max_delay_ms: std::env::var("SEQLOG_HOLE_FILL_MAX_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100),
            hole_fill_max_elapsed_ms: std::env::var("SEQLOG_HOLE_FILL_MAX_ELAPSED_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1_000),
            chain_length: std::env::var("SEQLOG_CHAIN_LENGTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(1),
        }
    }

    /// Build the configured hole-fill policy
    pub fn build_policy(&self) -> Arc<dyn HoleFillPolicy> {
        match self.hole_fill_policy {
            HoleFillPolicyKind::Immediate => Arc::new(ImmediateHoleFill),
            HoleFillPolicyKind::Fixed => Arc::new(FixedRetryHoleFill {
                max_attempts: self.hole_fill_max_attempts,
                delay: Duration::from_millis(self.hole_fill_delay_ms),
            }),
            HoleFillPolicyKind::Backoff => Arc::new(BackoffHoleFill {
                initial_delay: Duration::from_millis(self.hole_fill_delay_ms),
                max_delay: Duration::from_millis(self.hole_fill_max_delay_ms),
                max_elapsed: Duration::from_millis(self.hole_fill_max_elapsed_ms),
            }),
        }
    }
}
