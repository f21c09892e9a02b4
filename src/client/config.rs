//! Client configuration

/// Configuration for the append path
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Token/write rounds before an append gives up
    pub max_append_attempts: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_append_attempts: 5,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            max_append_attempts: std::env::var("SEQLOG_APPEND_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(5),
        }
    }
}
