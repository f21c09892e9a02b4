//! Sequencer bootstrap on layout change

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::config::ManagementConfig;
use super::recovery::rebuild_tails;
use crate::error::{SequencerError, ServerError, ServerResult};
use crate::replication::ReplicationProtocol;
use crate::traits::{
    BootstrapOutcome, BootstrapReply, BootstrapRequest, LayoutChange, LayoutChangeHandler,
    TokenService,
};
use crate::types::Epoch;

/// Reseeds the sequencer whenever the layout moves to a new epoch
///
/// Layout changes are handled one at a time. A change stamped with an epoch
/// older than the last one applied is nacked without touching the sequencer.
pub struct SequencerBootstrapper {
    sequencer: Arc<dyn TokenService>,
    protocol: Arc<dyn ReplicationProtocol>,
    config: ManagementConfig,
    last_applied: Mutex<Option<Epoch>>,
}

impl SequencerBootstrapper {
    pub fn new(
        sequencer: Arc<dyn TokenService>,
        protocol: Arc<dyn ReplicationProtocol>,
        config: ManagementConfig,
    ) -> Self {
        Self {
            sequencer,
            protocol,
            config,
            last_applied: Mutex::new(None),
        }
    }

    /// Epoch of the last acknowledged layout change
    pub async fn last_applied_epoch(&self) -> Option<Epoch> {
        *self.last_applied.lock().await
    }

    /// Compute the bootstrap request for `change` and send it
    async fn try_bootstrap(&self, change: &LayoutChange) -> ServerResult<BootstrapOutcome> {
        let request = if change.full_reset {
            let snapshot = rebuild_tails(
                self.protocol.as_ref(),
                change.rebuild_start,
                change.global_tail_hint,
                &change.stream_tail_hints,
                self.config.replay_batch_size,
            )
            .await?;

            BootstrapRequest {
                new_epoch: change.epoch,
                global_tail_hint: snapshot.global_tail,
                stream_tail_hints: snapshot.stream_tails,
                rebuild_start: change.rebuild_start,
                full_reset: true,
            }
        } else {
            BootstrapRequest::merge(
                change.epoch,
                change.global_tail_hint,
                change.stream_tail_hints.clone(),
            )
        };

        Ok(self.sequencer.bootstrap(request).await?)
    }

    /// Bootstrap with exponential backoff on transient failures
    async fn bootstrap_with_retry(&self, change: &LayoutChange) -> ServerResult<BootstrapOutcome> {
        let mut attempt = 0;
        let mut delay_ms = self.config.bootstrap_retry_base_ms;

        loop {
            match self.try_bootstrap(change).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => {
                    attempt += 1;
                    if !is_retryable(&e) || attempt >= self.config.bootstrap_retry_count {
                        return Err(e);
                    }

                    warn!(
                        epoch = %change.epoch,
                        attempt,
                        max_attempts = self.config.bootstrap_retry_count,
                        delay_ms,
                        error = %e,
                        "Sequencer bootstrap failed, retrying"
                    );

                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    delay_ms = delay_ms.saturating_mul(2);
                }
            }
        }
    }
}

/// A stale epoch means the sequencer already moved past this layout
fn is_retryable(e: &ServerError) -> bool {
    !matches!(e, ServerError::Sequencer(SequencerError::StaleEpoch { .. })) && e.is_recoverable()
}

#[async_trait]
impl LayoutChangeHandler for SequencerBootstrapper {
    async fn handle_layout_change(&self, change: LayoutChange) -> BootstrapReply {
        let mut last_applied = self.last_applied.lock().await;

        if let Some(last) = *last_applied {
            if change.epoch < last {
                warn!(
                    epoch = %change.epoch,
                    last_applied = %last,
                    "Ignoring layout change from an older epoch"
                );
                return BootstrapReply::Nack(format!(
                    "layout epoch {} is older than applied epoch {}",
                    change.epoch, last
                ));
            }
        }

        match self.bootstrap_with_retry(&change).await {
            Ok(outcome) => {
                *last_applied = Some(change.epoch);
                info!(
                    epoch = %change.epoch,
                    full_reset = change.full_reset,
                    outcome = ?outcome,
                    "Sequencer bootstrapped for new layout"
                );
                BootstrapReply::Ack
            }
            Err(e) => {
                if e.is_fatal() {
                    error!(epoch = %change.epoch, error = %e, "Sequencer bootstrap hit an invariant failure");
                } else {
                    warn!(
                        epoch = %change.epoch,
                        error_code = e.error_code(),
                        error = %e,
                        "Sequencer bootstrap rejected"
                    );
                }
                BootstrapReply::Nack(e.to_string())
            }
        }
    }
}
