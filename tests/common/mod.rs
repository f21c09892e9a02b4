//! Common test utilities and fixtures
//!
//! - A node wired from a sequencer task and an in-memory replication chain
//! - Entry builders
//! - Assertions over allocated runs and stream chains

pub mod assertions;
pub mod fixtures;

// Re-export commonly used items
pub use assertions::*;
pub use fixtures::*;

// Re-export frequently used external types for convenience
pub use std::sync::Arc;
