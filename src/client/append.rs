//! Append path: token, write, retry

use bytes::Bytes;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use super::config::ClientConfig;
use crate::error::{ReplicationError, SequencerError, ServerError, ServerResult};
use crate::replication::ReplicationProtocol;
use crate::traits::{LogData, LogEntry, TokenRequest, TokenResponse, TokenService};
use crate::types::{Epoch, LogPosition, StreamId};

/// Appends to and reads from the shared log
///
/// Tracks the newest epoch it has seen. A stale-epoch rejection carries the
/// sequencer's epoch, so the client adopts it and tries again.
pub struct LogClient {
    sequencer: Arc<dyn TokenService>,
    pub(super) protocol: Arc<dyn ReplicationProtocol>,
    config: ClientConfig,
    epoch: AtomicU64,
}

impl LogClient {
    pub fn new(
        sequencer: Arc<dyn TokenService>,
        protocol: Arc<dyn ReplicationProtocol>,
        config: ClientConfig,
        epoch: Epoch,
    ) -> Self {
        Self {
            sequencer,
            protocol,
            config,
            epoch: AtomicU64::new(epoch.value()),
        }
    }

    /// Newest epoch this client has seen
    pub fn epoch(&self) -> Epoch {
        Epoch::new(self.epoch.load(Ordering::SeqCst))
    }

    fn observe_epoch(&self, epoch: Epoch) {
        self.epoch.fetch_max(epoch.value(), Ordering::SeqCst);
    }

    /// Append `payload` to the log and to every stream in `streams`
    ///
    /// Returns the committed position. A position lost to a hole fill (a reader
    /// gave up on us) is abandoned and the append retries with a fresh token.
    pub async fn append(
        &self,
        streams: impl IntoIterator<Item = StreamId>,
        payload: impl Into<Bytes>,
    ) -> ServerResult<LogPosition> {
        let streams: BTreeSet<StreamId> = streams.into_iter().collect();
        let payload = payload.into();
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.try_append(&streams, &payload).await {
                Ok(position) => return Ok(position),
                Err(e) if attempt < self.config.max_append_attempts && is_retryable(&e) => {
                    warn!(
                        attempt,
                        max_attempts = self.config.max_append_attempts,
                        error_code = e.error_code(),
                        error = %e,
                        "Append failed, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_append(
        &self,
        streams: &BTreeSet<StreamId>,
        payload: &Bytes,
    ) -> ServerResult<LogPosition> {
        let request = TokenRequest::new(self.epoch(), 1, streams.iter().copied());
        let token = self.request_token(request).await?;
        let position = token.first_position;

        self.protocol
            .write(position, LogEntry::for_token(&token, payload.clone()))
            .await?;

        debug!(position = %position, streams = streams.len(), "Appended entry");
        Ok(position)
    }

    /// Send `request`, adopting the sequencer's epoch from the reply or rejection
    async fn request_token(&self, request: TokenRequest) -> ServerResult<TokenResponse> {
        match self.sequencer.allocate(request).await {
            Ok(token) => {
                self.observe_epoch(token.epoch);
                Ok(token)
            }
            Err(SequencerError::StaleEpoch { requested, current }) => {
                self.observe_epoch(current);
                Err(SequencerError::StaleEpoch { requested, current }.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Current global tail and the tails of `streams`
    pub async fn tails(
        &self,
        streams: impl IntoIterator<Item = StreamId>,
    ) -> ServerResult<TokenResponse> {
        let streams: BTreeSet<StreamId> = streams.into_iter().collect();
        match self.request_token(TokenRequest::query(self.epoch(), streams.iter().copied())).await {
            // Retry once under the epoch the rejection just taught us
            Err(ServerError::Sequencer(SequencerError::StaleEpoch { .. })) => {
                self.request_token(TokenRequest::query(self.epoch(), streams)).await
            }
            result => result,
        }
    }

    /// Resolve one position, hole-filling it if nobody completes the write
    pub async fn read(&self, position: LogPosition) -> ServerResult<LogData> {
        Ok(self.protocol.read(position).await?)
    }
}

fn is_retryable(e: &ServerError) -> bool {
    matches!(
        e,
        ServerError::Sequencer(SequencerError::StaleEpoch { .. })
            | ServerError::Replication(ReplicationError::WriteConflict { .. })
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replication::{ChainReplicationProtocol, ImmediateHoleFill, InMemoryLogUnit};
    use crate::sequencer::{Sequencer, SequencerConfig, SequencerHandle};
    use crate::traits::{BootstrapRequest, LogUnit};
    use std::collections::BTreeMap;

    fn setup(config: ClientConfig) -> (SequencerHandle, Arc<ChainReplicationProtocol>, LogClient) {
        let (handle, _task) = Sequencer::spawn(SequencerConfig::default());
        let unit: Arc<dyn LogUnit> = Arc::new(InMemoryLogUnit::new("unit-0"));
        let protocol =
            Arc::new(ChainReplicationProtocol::new(vec![unit], Arc::new(ImmediateHoleFill)).unwrap());
        let client = LogClient::new(
            Arc::new(handle.clone()),
            protocol.clone(),
            config,
            Epoch::new(0),
        );
        (handle, protocol, client)
    }

    #[tokio::test]
    async fn test_append_returns_consecutive_positions() {
        let (_handle, _protocol, client) = setup(ClientConfig::default());
        let a = StreamId::from_name("a");

        let first = client.append([a], &b"one"[..]).await.unwrap();
        let second = client.append([a], &b"two"[..]).await.unwrap();

        assert_eq!(first, LogPosition::new(0));
        assert_eq!(second, LogPosition::new(1));

        let entry = client.read(second).await.unwrap().into_entry().unwrap();
        assert_eq!(entry.backpointer(&a), Some(first));
        assert_eq!(entry.payload, Bytes::from_static(b"two"));
    }

    #[tokio::test]
    async fn test_append_skips_hole_filled_position() {
        let (_handle, protocol, client) = setup(ClientConfig::default());

        // A reader gave up on position 0 before anyone wrote it
        assert!(protocol.read(LogPosition::new(0)).await.unwrap().is_hole());

        let position = client.append(Vec::<StreamId>::new(), &b"data"[..]).await.unwrap();

        assert_eq!(position, LogPosition::new(1));
        assert!(client.read(LogPosition::new(0)).await.unwrap().is_hole());
    }

    #[tokio::test]
    async fn test_append_adopts_newer_epoch() {
        let (handle, _protocol, client) = setup(ClientConfig::default());
        handle
            .bootstrap(BootstrapRequest::merge(
                Epoch::new(4),
                LogPosition::new(10),
                BTreeMap::new(),
            ))
            .await
            .unwrap();

        let position = client.append(Vec::<StreamId>::new(), &b"data"[..]).await.unwrap();

        assert_eq!(position, LogPosition::new(10));
        assert_eq!(client.epoch(), Epoch::new(4));
    }

    #[tokio::test]
    async fn test_append_gives_up_after_max_attempts() {
        let (_handle, protocol, client) = setup(ClientConfig {
            max_append_attempts: 2,
        });
        protocol.read(LogPosition::new(0)).await.unwrap();
        protocol.read(LogPosition::new(1)).await.unwrap();

        let err = client.append(Vec::<StreamId>::new(), &b"data"[..]).await.unwrap_err();

        assert!(matches!(
            err,
            ServerError::Replication(ReplicationError::WriteConflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_tails_after_stale_epoch() {
        let (handle, _protocol, client) = setup(ClientConfig::default());
        let a = StreamId::from_name("a");
        client.append([a], &b"x"[..]).await.unwrap();
        handle
            .bootstrap(BootstrapRequest::merge(Epoch::new(2), LogPosition::ZERO, BTreeMap::new()))
            .await
            .unwrap();

        let tails = client.tails([a]).await.unwrap();

        assert_eq!(tails.epoch, Epoch::new(2));
        assert_eq!(tails.first_position, LogPosition::new(1));
        assert_eq!(tails.backpointer(&a), Some(LogPosition::ZERO));
    }
}
