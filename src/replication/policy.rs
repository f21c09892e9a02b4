//! Hole-fill policies: how long a reader waits on a pending position
//!
//! A policy only decides patience. The peek loop itself is shared, so a new
//! strategy is a new `retry_delay` and nothing in the protocol changes.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

use crate::error::{HoleFillRequired, PeekError, ReplicationResult};
use crate::traits::{LogData, SlotState};
use crate::types::LogPosition;

/// Read-side patience before a position is declared a hole
pub trait HoleFillPolicy: Send + Sync + fmt::Debug + 'static {
    /// Delay before the next peek, given how many peeks already came back
    /// uncommitted and how long the reader has waited so far.
    ///
    /// `None` means patience is exhausted and the position must be hole-filled.
    /// Implementations must return `None` eventually.
    fn retry_delay(&self, attempts: u32, elapsed: Duration) -> Option<Duration>;
}

impl<'a> dyn HoleFillPolicy + 'a {
    /// Peek until a committed value shows up or the policy gives up
    ///
    /// Errors from `peek` are returned as-is and never retried here.
    pub async fn peek_until_hole_fill_required<F, Fut>(
        &self,
        position: LogPosition,
        mut peek: F,
    ) -> Result<LogData, PeekError>
    where
        F: FnMut(LogPosition) -> Fut + Send,
        Fut: Future<Output = ReplicationResult<SlotState>> + Send,
    {
        let started = Instant::now();
        let mut attempts = 0u32;

        loop {
            attempts = attempts.saturating_add(1);
            if let Some(data) = peek(position).await?.into_committed() {
                return Ok(data);
            }

            let elapsed = started.elapsed();
            match self.retry_delay(attempts, elapsed) {
                Some(delay) => {
                    trace!(position = %position, attempts, ?delay, "Position pending, waiting");
                    tokio::time::sleep(delay).await;
                }
                None => {
                    return Err(HoleFillRequired {
                        position,
                        attempts,
                        elapsed,
                    }
                    .into());
                }
            }
        }
    }
}

/// Hole-fill after the first uncommitted peek
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateHoleFill;

impl HoleFillPolicy for ImmediateHoleFill {
    fn retry_delay(&self, _attempts: u32, _elapsed: Duration) -> Option<Duration> {
        None
    }
}

/// Peek up to `max_attempts` times with a fixed delay in between
#[derive(Debug, Clone, Copy)]
pub struct FixedRetryHoleFill {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl HoleFillPolicy for FixedRetryHoleFill {
    fn retry_delay(&self, attempts: u32, _elapsed: Duration) -> Option<Duration> {
        (attempts < self.max_attempts).then_some(self.delay)
    }
}

/// Doubling delay capped at `max_delay`, until `max_elapsed` has passed
#[derive(Debug, Clone, Copy)]
pub struct BackoffHoleFill {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub max_elapsed: Duration,
}

impl HoleFillPolicy for BackoffHoleFill {
    fn retry_delay(&self, attempts: u32, elapsed: Duration) -> Option<Duration> {
        let remaining = self.max_elapsed.checked_sub(elapsed)?;
        if remaining.is_zero() {
            return None;
        }

        let shift = attempts.saturating_sub(1).min(31);
        let delay = self
            .initial_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
            .min(remaining);
        Some(delay)
    }
}

/// Policy selector used by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoleFillPolicyKind {
    Immediate,
    Fixed,
    Backoff,
}

impl FromStr for HoleFillPolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "immediate" => Ok(HoleFillPolicyKind::Immediate),
            "fixed" => Ok(HoleFillPolicyKind::Fixed),
            "backoff" => Ok(HoleFillPolicyKind::Backoff),
            other => Err(format!("unknown hole fill policy: {other}")),
        }
    }
}

impl fmt::Display for HoleFillPolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HoleFillPolicyKind::Immediate => "immediate",
            HoleFillPolicyKind::Fixed => "fixed",
            HoleFillPolicyKind::Backoff => "backoff",
        };
        f.write_str(name)
    }
}
