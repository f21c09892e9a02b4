//! Management module - sequencer reseeding on layout change
//!
//! - Stale layout changes are nacked
//! - Full resets replay the log to recompute tails
//! - Other changes merge hints into the live sequencer

mod bootstrap;
mod config;
mod recovery;

pub use bootstrap::SequencerBootstrapper;
pub use config::ManagementConfig;
pub use recovery::{rebuild_tails, TailSnapshot};
