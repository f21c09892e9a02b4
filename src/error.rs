//! Error types for the sequencer and replication core

use std::time::Duration;
use thiserror::Error;

use crate::types::{Epoch, LogPosition};

/// Top-level error type
#[derive(Debug, Error)]
pub enum ServerError {
    // ========== Subsystem Errors ==========
    /// Token allocation or sequencer bootstrap failed
    #[error("sequencer error: {0}")]
    Sequencer(#[from] SequencerError),

    /// Log read/write failed
    #[error("replication error: {0}")]
    Replication(#[from] ReplicationError),

    // ========== Server Errors ==========
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Sequencer errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequencerError {
    /// Request was computed against an older layout
    #[error("stale epoch {requested}, sequencer is at epoch {current}")]
    StaleEpoch { requested: Epoch, current: Epoch },

    /// Malformed request, rejected before any state change
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Global tail would wrap around; the sequencer cannot make progress
    #[error("global tail overflow: tail {global_tail} cannot advance by {count}")]
    TailOverflow { global_tail: LogPosition, count: u64 },

    /// Sequencer task is gone (shut down)
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Replication errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplicationError {
    /// A conditional write lost the race for this position
    #[error("write conflict at position {position}")]
    WriteConflict { position: LogPosition },

    /// Transient failure reaching a log unit
    #[error("network error: {0}")]
    Network(String),

    /// Replicas disagree about a committed position
    #[error("inconsistent replicas at position {position}: {detail}")]
    Inconsistent { position: LogPosition, detail: String },

    /// Position still not committed after a hole fill
    #[error("position {position} unresolved after hole fill")]
    Unresolved { position: LogPosition },

    /// Malformed request or protocol setup
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Patience exhausted while waiting for a pending position
///
/// Raised by a hole-fill policy and consumed by `read`; never returned to readers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("hole fill required at position {position} after {attempts} peeks ({elapsed:?})")]
pub struct HoleFillRequired {
    pub position: LogPosition,
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Outcome of a policy-driven peek loop that did not produce a value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeekError {
    #[error(transparent)]
    HoleFillRequired(#[from] HoleFillRequired),

    #[error(transparent)]
    Replication(#[from] ReplicationError),
}

/// Server result type alias
pub type ServerResult<T> = Result<T, ServerError>;

/// Sequencer result type alias
pub type SequencerResult<T> = Result<T, SequencerError>;

/// Replication result type alias
pub type ReplicationResult<T> = Result<T, ReplicationError>;

impl SequencerError {
    /// Error code for responses and logs
    pub fn error_code(&self) -> &'static str {
        match self {
            SequencerError::StaleEpoch { .. } => "STALE_EPOCH",
            SequencerError::InvalidArgument(_) => "INVALID_ARGUMENT",
            SequencerError::TailOverflow { .. } => "TAIL_OVERFLOW",
            SequencerError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            SequencerError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if the caller can retry (after refreshing its epoch where relevant)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SequencerError::StaleEpoch { .. } | SequencerError::ServiceUnavailable(_)
        )
    }

    /// Internal invariant failure, not an operational error
    pub fn is_fatal(&self) -> bool {
        matches!(self, SequencerError::TailOverflow { .. })
    }
}

impl ReplicationError {
    /// Error code for responses and logs
    pub fn error_code(&self) -> &'static str {
        match self {
            ReplicationError::WriteConflict { .. } => "WRITE_CONFLICT",
            ReplicationError::Network(_) => "NETWORK_ERROR",
            ReplicationError::Inconsistent { .. } => "INCONSISTENT_REPLICAS",
            ReplicationError::Unresolved { .. } => "UNRESOLVED_POSITION",
            ReplicationError::InvalidArgument(_) => "INVALID_ARGUMENT",
        }
    }

    /// Check if the caller can retry
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ReplicationError::Network(_) | ReplicationError::Unresolved { .. }
        )
    }

    /// Internal invariant failure, not an operational error
    pub fn is_fatal(&self) -> bool {
        matches!(self, ReplicationError::Inconsistent { .. })
    }
}

impl ServerError {
    /// Get error code for responses and logs
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::Sequencer(e) => e.error_code(),
            ServerError::Replication(e) => e.error_code(),
            ServerError::Config(_) => "CONFIG_ERROR",
            ServerError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if error is recoverable (client can retry)
    pub fn is_recoverable(&self) -> bool {
        match self {
            ServerError::Sequencer(e) => e.is_recoverable(),
            ServerError::Replication(e) => e.is_recoverable(),
            ServerError::Config(_) | ServerError::Internal(_) => false,
        }
    }

    /// Check if error signals a broken internal invariant
    pub fn is_fatal(&self) -> bool {
        match self {
            ServerError::Sequencer(e) => e.is_fatal(),
            ServerError::Replication(e) => e.is_fatal(),
            ServerError::Config(_) | ServerError::Internal(_) => false,
        }
    }
}

impl From<PeekError> for ServerError {
    fn from(e: PeekError) -> Self {
        match e {
            PeekError::Replication(inner) => ServerError::Replication(inner),
            PeekError::HoleFillRequired(signal) => ServerError::Internal(signal.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== Error Code Tests ==========

    #[test]
    fn test_sequencer_error_codes() {
        assert_eq!(
            SequencerError::StaleEpoch {
                requested: Epoch::new(0),
                current: Epoch::new(1)
            }
            .error_code(),
            "STALE_EPOCH"
        );
        assert_eq!(
            SequencerError::TailOverflow {
                global_tail: LogPosition::new(u64::MAX),
                count: 1
            }
            .error_code(),
            "TAIL_OVERFLOW"
        );
    }

    #[test]
    fn test_server_error_delegates_error_code() {
        let err: ServerError = ReplicationError::WriteConflict {
            position: LogPosition::new(3),
        }
        .into();
        assert_eq!(err.error_code(), "WRITE_CONFLICT");

        assert_eq!(ServerError::Config("x".into()).error_code(), "CONFIG_ERROR");
    }

    // ========== Classification Tests ==========

    #[test]
    fn test_stale_epoch_is_recoverable_not_fatal() {
        let err = SequencerError::StaleEpoch {
            requested: Epoch::new(0),
            current: Epoch::new(1),
        };
        assert!(err.is_recoverable());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_invariant_failures_are_fatal() {
        let overflow: ServerError = SequencerError::TailOverflow {
            global_tail: LogPosition::new(u64::MAX),
            count: 2,
        }
        .into();
        assert!(overflow.is_fatal());
        assert!(!overflow.is_recoverable());

        let inconsistent: ServerError = ReplicationError::Inconsistent {
            position: LogPosition::new(1),
            detail: "tail differs from head".into(),
        }
        .into();
        assert!(inconsistent.is_fatal());
    }

    #[test]
    fn test_write_conflict_is_not_recoverable() {
        let err = ReplicationError::WriteConflict {
            position: LogPosition::new(9),
        };
        assert!(!err.is_recoverable());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_network_error_is_recoverable() {
        assert!(ReplicationError::Network("connection reset".into()).is_recoverable());
    }

    // ========== Display Tests ==========

    #[test]
    fn test_stale_epoch_display() {
        let err = SequencerError::StaleEpoch {
            requested: Epoch::new(2),
            current: Epoch::new(5),
        };
        assert_eq!(err.to_string(), "stale epoch 2, sequencer is at epoch 5");
    }

    #[test]
    fn test_peek_error_wraps_replication_error() {
        let err: PeekError = ReplicationError::Network("down".into()).into();
        let server: ServerError = err.into();
        assert!(matches!(
            server,
            ServerError::Replication(ReplicationError::Network(_))
        ));
    }
}
