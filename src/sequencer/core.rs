//! Sequencer core logic - single owner of the token state

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::buffer::{SequencerCommand, SequencerHandle};
use super::config::SequencerConfig;
use super::state::TokenState;
use crate::error::{SequencerError, SequencerResult};
use crate::traits::{BootstrapOutcome, BootstrapRequest, TokenRequest, TokenResponse};

/// The Sequencer serializes every allocation and bootstrap through one task
pub struct Sequencer {
    /// Tails and epoch; touched only by this task
    state: TokenState,

    /// Configuration
    config: SequencerConfig,

    /// Receiver for incoming commands
    rx: mpsc::Receiver<SequencerCommand>,
}

impl Sequencer {
    /// Create a new Sequencer and return its handle
    pub fn new(config: SequencerConfig) -> (Self, SequencerHandle) {
        let (tx, rx) = mpsc::channel(config.buffer_size);

        let sequencer = Self {
            state: TokenState::new(config.initial_epoch, config.max_tokens_per_request),
            config,
            rx,
        };

        (sequencer, SequencerHandle::new(tx))
    }

    /// Create a Sequencer and run it on the current tokio runtime
    pub fn spawn(config: SequencerConfig) -> (SequencerHandle, JoinHandle<()>) {
        let (sequencer, handle) = Self::new(config);
        (handle, tokio::spawn(sequencer.run()))
    }

    /// Run the Sequencer loop until every handle is dropped
    pub async fn run(mut self) {
        info!(
            epoch = %self.state.epoch(),
            buffer_size = self.config.buffer_size,
            max_tokens_per_request = self.config.max_tokens_per_request,
            "Sequencer started"
        );

        while let Some(command) = self.rx.recv().await {
            self.handle(command);
        }

        info!(
            epoch = %self.state.epoch(),
            global_tail = %self.state.global_tail(),
            "Sequencer shutting down"
        );
    }

    fn handle(&mut self, command: SequencerCommand) {
        match command {
            SequencerCommand::Allocate {
                request,
                response_tx,
            } => {
                let result = self.allocate(&request);
                // Ignore send error (client may have gone away)
                let _ = response_tx.send(result);
            }
            SequencerCommand::Bootstrap {
                request,
                response_tx,
            } => {
                let result = self.bootstrap(&request);
                let _ = response_tx.send(result);
            }
            SequencerCommand::Metrics { response_tx } => {
                let _ = response_tx.send(self.state.metrics());
            }
        }
    }

    fn allocate(&mut self, request: &TokenRequest) -> SequencerResult<TokenResponse> {
        let result = self.state.allocate(request);

        match &result {
            Ok(response) => debug!(
                epoch = %response.epoch,
                first = %response.first_position,
                count = response.count,
                streams = request.streams.len(),
                "Token issued"
            ),
            Err(SequencerError::StaleEpoch { requested, current }) => warn!(
                requested = %requested,
                current = %current,
                "Rejected token request with stale epoch"
            ),
            Err(e) if e.is_fatal() => error!(
                error = %e,
                count = request.count,
                "Sequencer invariant violated"
            ),
            Err(e) => warn!(error = %e, count = request.count, "Rejected token request"),
        }

        result
    }

    fn bootstrap(&mut self, request: &BootstrapRequest) -> SequencerResult<BootstrapOutcome> {
        let previous_epoch = self.state.epoch();
        let result = self.state.bootstrap(request);

        match &result {
            Ok(BootstrapOutcome::Applied) => info!(
                previous_epoch = %previous_epoch,
                epoch = %self.state.epoch(),
                global_tail = %self.state.global_tail(),
                streams = request.stream_tail_hints.len(),
                full_reset = request.full_reset,
                "Sequencer bootstrapped"
            ),
            Ok(BootstrapOutcome::AlreadyApplied) => debug!(
                epoch = %request.new_epoch,
                "Ignoring repeated bootstrap"
            ),
            Err(e) => warn!(
                epoch = %request.new_epoch,
                current = %previous_epoch,
                error = %e,
                "Rejected sequencer bootstrap"
            ),
        }

        result
    }
}
