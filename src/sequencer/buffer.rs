//! Bounded command channel between clients and the sequencer task

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::error::{SequencerError, SequencerResult};
use crate::traits::{
    BootstrapOutcome, BootstrapRequest, SequencerMetrics, TokenRequest, TokenResponse,
    TokenService,
};

/// A command for the sequencer task, with its response channel
#[derive(Debug)]
pub enum SequencerCommand {
    Allocate {
        request: TokenRequest,
        response_tx: oneshot::Sender<SequencerResult<TokenResponse>>,
    },
    Bootstrap {
        request: BootstrapRequest,
        response_tx: oneshot::Sender<SequencerResult<BootstrapOutcome>>,
    },
    Metrics {
        response_tx: oneshot::Sender<SequencerMetrics>,
    },
}

/// Handle for submitting requests to the Sequencer
#[derive(Clone)]
pub struct SequencerHandle {
    /// Sender side of the bounded channel
    tx: mpsc::Sender<SequencerCommand>,
}

impl SequencerHandle {
    /// Create a new handle from a sender channel
    pub(crate) fn new(tx: mpsc::Sender<SequencerCommand>) -> Self {
        Self { tx }
    }

    /// Allocate positions (or query tails) and wait for the response
    ///
    /// Returns error if:
    /// - Request epoch is stale
    /// - Request is malformed
    /// - Sequencer has shut down
    pub async fn allocate(&self, request: TokenRequest) -> SequencerResult<TokenResponse> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(SequencerCommand::Allocate {
            request,
            response_tx,
        })
        .await?;
        Self::receive(response_rx).await?
    }

    /// Reseed the sequencer for a new epoch
    pub async fn bootstrap(&self, request: BootstrapRequest) -> SequencerResult<BootstrapOutcome> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(SequencerCommand::Bootstrap {
            request,
            response_tx,
        })
        .await?;
        Self::receive(response_rx).await?
    }

    /// Snapshot of the sequencer's counters
    pub async fn metrics(&self) -> SequencerResult<SequencerMetrics> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(SequencerCommand::Metrics { response_tx }).await?;
        Self::receive(response_rx).await
    }

    /// Whether the sequencer task has stopped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn send(&self, command: SequencerCommand) -> SequencerResult<()> {
        // Waits while the buffer is full (backpressure); fails only once the task is gone
        self.tx.send(command).await.map_err(|_| {
            SequencerError::ServiceUnavailable("sequencer has shut down".into())
        })
    }

    async fn receive<T>(response_rx: oneshot::Receiver<T>) -> SequencerResult<T> {
        response_rx
            .await
            .map_err(|_| SequencerError::Internal("sequencer dropped response channel".into()))
    }
}

#[async_trait]
impl TokenService for SequencerHandle {
    async fn allocate(&self, request: TokenRequest) -> SequencerResult<TokenResponse> {
        SequencerHandle::allocate(self, request).await
    }

    async fn bootstrap(&self, request: BootstrapRequest) -> SequencerResult<BootstrapOutcome> {
        SequencerHandle::bootstrap(self, request).await
    }

    async fn metrics(&self) -> SequencerResult<SequencerMetrics> {
        SequencerHandle::metrics(self).await
    }
}
