//! Node configuration

use crate::client::ClientConfig;
use crate::error::{ServerError, ServerResult};
use crate::management::ManagementConfig;
use crate::replication::ReplicationConfig;
use crate::sequencer::SequencerConfig;

/// Node configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub sequencer: SequencerConfig,
    pub replication: ReplicationConfig,
    pub management: ManagementConfig,
    pub client: ClientConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            sequencer: SequencerConfig::default(),
            replication: ReplicationConfig::default(),
            management: ManagementConfig::default(),
            client: ClientConfig::default(),
        }
    }
}

impl Config {
    /// Load every section from environment variables
    ///
    /// # Environment Variables
    ///
    /// - `SEQLOG_LOG_LEVEL`: tracing filter (default `info`)
    /// - `SEQLOG_SEQUENCER_BUFFER_SIZE`, `SEQLOG_INITIAL_EPOCH`, `SEQLOG_MAX_TOKENS_PER_REQUEST`
    /// - `SEQLOG_HOLE_FILL_*`, `SEQLOG_CHAIN_LENGTH`: see `ReplicationConfig::from_env`
    /// - `SEQLOG_BOOTSTRAP_*`, `SEQLOG_REPLAY_BATCH_SIZE`: see `ManagementConfig::from_env`
    /// - `SEQLOG_APPEND_MAX_ATTEMPTS`: see `ClientConfig::from_env`
    pub fn from_env() -> Self {
        Self {
            log_level: std::env::var("SEQLOG_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            sequencer: SequencerConfig::from_env(),
            replication: ReplicationConfig::from_env(),
            management: ManagementConfig::from_env(),
            client: ClientConfig::from_env(),
        }
    }

    /// Reject settings a node cannot start with
    pub fn validate(&self) -> ServerResult<()> {
        if self.sequencer.max_tokens_per_request == 0 {
            return Err(ServerError::Config(
                "max_tokens_per_request must be at least 1".into(),
            ));
        }
        if self.replication.chain_length == 0 {
            return Err(ServerError::Config("chain_length must be at least 1".into()));
        }
        if self.replication.hole_fill_max_delay_ms < self.replication.hole_fill_delay_ms {
            return Err(ServerError::Config(format!(
                "hole_fill_max_delay_ms ({}) is below hole_fill_delay_ms ({})",
                self.replication.hole_fill_max_delay_ms, self.replication.hole_fill_delay_ms
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replication::HoleFillPolicyKind;
    use serial_test::serial;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.sequencer.buffer_size, 10_000);
        assert_eq!(config.replication.hole_fill_policy, HoleFillPolicyKind::Backoff);
        assert_eq!(config.management.bootstrap_retry_count, 3);
        assert_eq!(config.client.max_append_attempts, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_config_from_env_log_level() {
        std::env::set_var("SEQLOG_LOG_LEVEL", "debug");
        let config = Config::from_env();
        assert_eq!(config.log_level, "debug");
        std::env::remove_var("SEQLOG_LOG_LEVEL");

        let config = Config::from_env();
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_validate_rejects_zero_chain() {
        let mut config = Config::default();
        config.replication.chain_length = 0;

        let err = config.validate().unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_validate_rejects_inverted_backoff() {
        let mut config = Config::default();
        config.replication.hole_fill_delay_ms = 500;
        config.replication.hole_fill_max_delay_ms = 100;

        assert!(matches!(config.validate(), Err(ServerError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_token_limit() {
        let mut config = Config::default();
        config.sequencer.max_tokens_per_request = 0;

        assert!(config.validate().is_err());
    }
}
