//! seqlog - sequencer and replication node for a distributed shared log

use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seqlog::client::LogClient;
use seqlog::management::SequencerBootstrapper;
use seqlog::replication::{ChainReplicationProtocol, InMemoryLogUnit, ReplicationProtocol};
use seqlog::sequencer::Sequencer;
use seqlog::traits::{LogUnit, TokenService};
use seqlog::Config;

#[derive(Parser, Debug)]
#[command(name = "seqlog")]
#[command(about = "Sequencer and replication node for a distributed shared log")]
struct Args {
    /// Log level
    #[arg(long, env = "SEQLOG_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Number of in-memory log units in the replication chain
    #[arg(long, env = "SEQLOG_CHAIN_LENGTH")]
    chain_length: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI args
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&args.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting seqlog v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::from_env();
    config.log_level = args.log_level;
    if let Some(chain_length) = args.chain_length {
        config.replication.chain_length = chain_length;
    }
    config.validate()?;

    let (handle, sequencer_task) = Sequencer::spawn(config.sequencer.clone());
    let sequencer: Arc<dyn TokenService> = Arc::new(handle);

    let chain: Vec<Arc<dyn LogUnit>> = (0..config.replication.chain_length)
        .map(|i| Arc::new(InMemoryLogUnit::new(format!("log-unit-{i}"))) as Arc<dyn LogUnit>)
        .collect();
    let protocol: Arc<dyn ReplicationProtocol> = Arc::new(ChainReplicationProtocol::new(
        chain,
        config.replication.build_policy(),
    )?);

    // Attachment points for a transport layer
    let bootstrapper = SequencerBootstrapper::new(
        Arc::clone(&sequencer),
        Arc::clone(&protocol),
        config.management.clone(),
    );
    let client = LogClient::new(
        Arc::clone(&sequencer),
        Arc::clone(&protocol),
        config.client.clone(),
        config.sequencer.initial_epoch,
    );

    let metrics = sequencer.metrics().await?;
    tracing::info!(
        epoch = %metrics.epoch,
        global_tail = %metrics.global_tail,
        chain_length = config.replication.chain_length,
        hole_fill_policy = %config.replication.hole_fill_policy,
        "Node ready"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    // Dropping the last handles closes the sequencer channel
    drop(client);
    drop(bootstrapper);
    drop(sequencer);
    sequencer_task.await?;

    Ok(())
}
