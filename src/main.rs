//! Sync Simulator CLI
//!
//! Runs the synchronizer and the transaction announcement intake against
//! simulated activities and peers.
//!
//! # Example
//!
//! ```bash
//! # Fast sync towards a chain 20k blocks ahead, then follow it for 30s
//! sync-sim --fast-sync --chain-height 20000 --duration 30
//!
//! # Load settings from YAML and expose Prometheus metrics
//! sync-sim --config node.yaml --metrics --metrics-port 9090
//! ```

mod simulation;

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chain::config::{NodeConfig, SyncMode};
use clap::Parser;
use containers::BlockNumber;
use metrics::Metrics;
use metrics::server::{MetricsServerConfig, run_metrics_server};
use networking::sync::{
    FastSyncDownloader, InSyncListener, Pruner, SyncActivities, SyncState, Synchronizer,
};
use networking::transactions::{
    InMemoryTransactionPool, NewPooledTransactionHashesProcessor, PeerTransactionTracker,
};
use networking::TokioScheduler;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use simulation::{
    AnnouncementWorkload, InMemoryWorldState, SimulatedBlockPropagation, SimulatedFastSync,
    SimulatedFullSync, SimulatedPeer, SimulatedPruner,
};

#[derive(Parser, Debug)]
#[command(name = "sync-sim")]
#[command(version, about, long_about = None)]
struct Args {
    /// YAML node configuration. Defaults are used for anything it omits.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fast sync before following the chain, overriding the configured mode
    #[arg(long)]
    fast_sync: bool,

    /// Best chain height the peers start out with
    #[arg(long, default_value_t = 5_000)]
    chain_height: u64,

    /// Stop full sync once the local head reaches this block
    #[arg(long)]
    target_height: Option<u64>,

    /// Milliseconds between new blocks on the simulated chain
    #[arg(long, default_value_t = 1_000)]
    block_time: u64,

    /// Number of simulated peers announcing transactions
    #[arg(short, long, default_value_t = 8)]
    peers: usize,

    /// Milliseconds between announcements
    #[arg(long, default_value_t = 20)]
    announce_interval: u64,

    /// Simulation duration in seconds
    #[arg(short, long, default_value_t = 30)]
    duration: u64,

    /// Random seed for the announcement workload
    #[arg(long)]
    seed: Option<u64>,

    /// Serve Prometheus metrics while running
    #[arg(long)]
    metrics: bool,

    #[arg(long, default_value = "127.0.0.1")]
    metrics_address: IpAddr,

    #[arg(long, default_value_t = 9090)]
    metrics_port: u16,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,networking=debug")),
        )
        .init();

    let args = Args::parse();

    if let Err(err) = run(args).await {
        error!("Simulation failed: {err:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => NodeConfig::from_yaml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => NodeConfig::default(),
    };
    if args.fast_sync {
        config.synchronizer.sync_mode = SyncMode::Fast;
    }
    let seed = args.seed.unwrap_or_else(rand::random);

    info!(
        sync_mode = ?config.synchronizer.sync_mode,
        pruning = config.synchronizer.pruning_enabled,
        chain_height = args.chain_height,
        peers = args.peers,
        duration_secs = args.duration,
        seed,
        "Starting sync simulation"
    );

    let metrics = Arc::new(Metrics::new());
    let (stop_simulation, simulation_stop) = watch::channel(false);
    let metrics_handle = args.metrics.then(|| {
        let server_config = MetricsServerConfig {
            metrics_address: args.metrics_address,
            metrics_port: args.metrics_port,
        };
        let server_metrics = metrics.clone();
        let mut server_stop = simulation_stop.clone();
        tokio::spawn(async move {
            let shutdown = async move {
                let _ = server_stop.wait_for(|stop| *stop).await;
            };
            if let Err(err) = run_metrics_server(server_config, server_metrics, shutdown).await {
                warn!("Metrics server exited with error: {err:#}");
            }
        })
    });

    let sync_state = Arc::new(SyncState::new(config.synchronizer.in_sync_tolerance));
    sync_state.update_best_peer_height(BlockNumber(args.chain_height));

    let world_state = Arc::new(InMemoryWorldState::default());
    let activities = SyncActivities {
        block_propagation: Arc::new(SimulatedBlockPropagation::new(
            sync_state.clone(),
            Duration::from_millis(args.block_time),
        )),
        fast_sync: match config.synchronizer.sync_mode {
            SyncMode::Fast => Some(
                Arc::new(SimulatedFastSync::new(sync_state.clone())) as Arc<dyn FastSyncDownloader>
            ),
            SyncMode::Full => None,
        },
        full_sync: Arc::new(SimulatedFullSync::new(
            sync_state.clone(),
            args.target_height.map(BlockNumber),
        )),
        pruner: config
            .synchronizer
            .pruning_enabled
            .then(|| Arc::new(SimulatedPruner::default()) as Arc<dyn Pruner>),
        world_state: world_state.clone(),
    };
    let synchronizer = Synchronizer::new(activities, sync_state.clone(), &metrics);

    let in_sync_listener: InSyncListener = Arc::new(|in_sync| {
        info!(in_sync, "Sync status changed");
    });
    synchronizer.subscribe_in_sync(in_sync_listener);

    let pool = Arc::new(InMemoryTransactionPool::new());
    let processor = NewPooledTransactionHashesProcessor::new(
        Arc::new(PeerTransactionTracker::new()),
        pool.clone(),
        config.transaction_pool.clone(),
        Arc::new(TokioScheduler::current()),
        metrics.clone(),
        sync_state.clone(),
    );

    let workload = AnnouncementWorkload {
        peers: (0..args.peers)
            .map(|_| SimulatedPeer::new(Duration::from_millis(30)))
            .collect(),
        interval: Duration::from_millis(args.announce_interval),
        transactions_per_announcement: 4,
        shared_ratio: 0.3,
        keep_alive: config.transaction_pool.transactions_message_keep_alive,
        seed,
    };
    let workload_handle = tokio::spawn(workload.run(processor.clone(), simulation_stop));

    let completion = synchronizer.start()?;
    tokio::select! {
        result = completion => match result {
            Ok(()) => info!("Synchronizer completed"),
            Err(err) => warn!("Synchronizer failed: {err:#}"),
        },
        _ = tokio::time::sleep(Duration::from_secs(args.duration)) => {
            info!("Simulation time elapsed");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
        }
    }

    synchronizer.stop();
    synchronizer.await_stop().await?;
    let _ = stop_simulation.send(true);
    workload_handle.await.context("announcement workload panicked")?;
    if let Some(handle) = metrics_handle {
        handle.await.context("metrics server panicked")?;
    }

    info!(
        local_head = sync_state.local_chain_height().0,
        best_height = sync_state.best_chain_height().0,
        pivot = ?world_state.archived_header().map(|header| header.number.0),
        pooled_transactions = pool.len(),
        requests = metrics.pooled_transactions_requests(),
        requested_hashes = metrics.pooled_transaction_hashes_requested(),
        already_pooled = metrics.announced_hashes_already_pooled(),
        "Simulation finished"
    );

    Ok(())
}
