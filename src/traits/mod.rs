//! Trait definitions for the log-unit, sequencer and reconfiguration boundaries

pub mod log_unit;
pub mod reconfiguration;
pub mod sequencer;

// Re-export all types
pub use log_unit::{LogData, LogEntry, LogUnit, SlotState, WriteOutcome};
pub use reconfiguration::{BootstrapReply, LayoutChange, LayoutChangeHandler};
pub use sequencer::{
    BootstrapOutcome, BootstrapRequest, SequencerMetrics, TokenRequest, TokenResponse,
    TokenService,
};
