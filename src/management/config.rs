//! Management configuration

/// Configuration for reacting to layout changes
#[derive(Debug, Clone)]
pub struct ManagementConfig {
    /// Bootstrap attempts before nacking a layout change
    pub bootstrap_retry_count: u32,

    /// Base delay between attempts in milliseconds (doubles each retry)
    pub bootstrap_retry_base_ms: u64,

    /// Positions resolved concurrently while replaying the log
    pub replay_batch_size: usize,
}

impl Default for ManagementConfig {
    fn default() -> Self {
        Self {
            bootstrap_retry_count: 3,
            bootstrap_retry_base_ms: 10,
            replay_batch_size: 256,
        }
    }
}

impl ManagementConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            bootstrap_retry_count: std::env::var("SEQLOG_BOOTSTRAP_RETRY_COUNT")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(3),
            bootstrap_retry_base_ms: std::env::var("SEQLOG_BOOTSTRAP_RETRY_BASE_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            replay_batch_size: std::env::var("SEQLOG_REPLAY_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(256),
        }
    }
}
