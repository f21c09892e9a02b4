//! Sequencer module - epoch-scoped allocation of log positions
//!
//! One task owns the global tail and the per-stream tails. Clients talk to it
//! through a cloneable `SequencerHandle` over a bounded channel, which makes
//! every allocation and bootstrap linearizable.

mod buffer;
mod config;
mod core;
mod state;

pub use buffer::{SequencerCommand, SequencerHandle};
pub use config::SequencerConfig;
pub use core::Sequencer;
pub use state::TokenState;
