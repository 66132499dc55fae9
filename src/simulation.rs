/// In-process stand-ins for the chain, the downloaders and remote peers.
///
/// Heights move on a timer instead of by importing blocks; peers invent
/// transactions and announce their hashes, some of them shared between peers
/// so the aggregation and pool filtering have something to do.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use containers::{BlockHeader, BlockNumber, Hash, Transaction};
use futures::FutureExt;
use futures::future::BoxFuture;
use libp2p_identity::PeerId;
use networking::sync::{
    BlockPropagation, FastSyncDownloader, FastSyncState, FullSyncDownloader, Pruner, SyncState,
    TrailingPeerRequirements, WorldStateArchive,
};
use networking::transactions::{NewPooledTransactionHashesMessage, NewPooledTransactionHashesProcessor};
use networking::types::{ConnectionState, DisconnectReason};
use networking::EthPeer;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tokio::time::{self, Instant};
use tracing::{debug, info};

const TICK: Duration = Duration::from_millis(50);
/// Blocks behind the best peer the fast sync pivot is chosen at.
const PIVOT_DISTANCE: u64 = 64;
const FAST_SYNC_BLOCKS_PER_TICK: u64 = 500;
const FULL_SYNC_BLOCKS_PER_TICK: u64 = 20;
const MAX_TRAILING_PEERS: u64 = 2;

/// Stop signal shared by a start and the matching stop.
#[derive(Debug)]
struct StopSignal {
    sender: watch::Sender<bool>,
}

impl StopSignal {
    fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    fn arm(&self) -> watch::Receiver<bool> {
        self.sender.send_replace(false);
        self.sender.subscribe()
    }

    fn trigger(&self) {
        self.sender.send_replace(true);
    }
}

async fn stopped(receiver: &mut watch::Receiver<bool>) {
    while !*receiver.borrow() {
        if receiver.changed().await.is_err() {
            return;
        }
    }
}

/// Raises the best peer height while propagation runs, as new blocks would.
pub struct SimulatedBlockPropagation {
    sync_state: Arc<SyncState>,
    block_time: Duration,
    stop: StopSignal,
}

impl SimulatedBlockPropagation {
    pub fn new(sync_state: Arc<SyncState>, block_time: Duration) -> Self {
        Self {
            sync_state,
            block_time,
            stop: StopSignal::new(),
        }
    }
}

impl BlockPropagation for SimulatedBlockPropagation {
    fn start(&self) {
        let mut stop = self.stop.arm();
        let sync_state = Arc::clone(&self.sync_state);
        let block_time = self.block_time;
        tokio::spawn(async move {
            let mut interval = time::interval(block_time);
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = stopped(&mut stop) => break,
                    _ = interval.tick() => {
                        let next = sync_state.best_chain_height().next();
                        sync_state.update_best_peer_height(next);
                    }
                }
            }
            debug!("Block propagation stopped");
        });
    }

    fn stop(&self) {
        self.stop.trigger();
    }
}

pub struct SimulatedFastSync {
    sync_state: Arc<SyncState>,
    stop: StopSignal,
    persisted_pivot: Mutex<Option<BlockNumber>>,
}

impl SimulatedFastSync {
    pub fn new(sync_state: Arc<SyncState>) -> Self {
        Self {
            sync_state,
            stop: StopSignal::new(),
            persisted_pivot: Mutex::new(None),
        }
    }
}

impl FastSyncDownloader for SimulatedFastSync {
    fn start(&self) -> BoxFuture<'static, Result<FastSyncState>> {
        let mut stop = self.stop.arm();
        let sync_state = Arc::clone(&self.sync_state);
        let pivot = {
            let mut persisted_pivot = self.persisted_pivot.lock();
            *persisted_pivot.get_or_insert_with(|| {
                BlockNumber(sync_state.best_chain_height().0.saturating_sub(PIVOT_DISTANCE))
            })
        };
        info!(pivot = pivot.0, "Fast sync selected pivot block");

        async move {
            let mut interval = time::interval(TICK);
            loop {
                tokio::select! {
                    _ = stopped(&mut stop) => bail!("fast sync stopped"),
                    _ = interval.tick() => {
                        let local = sync_state.local_chain_height();
                        if local >= pivot {
                            break;
                        }
                        let next = BlockNumber((local.0 + FAST_SYNC_BLOCKS_PER_TICK).min(pivot.0));
                        sync_state.set_local_chain_head(next);
                    }
                }
            }
            let pivot_header = BlockHeader::new(pivot, Hash::ZERO, Hash::repeat_byte(0x5a));
            Ok(FastSyncState::with_pivot(pivot_header))
        }
        .boxed()
    }

    fn stop(&self) {
        self.stop.trigger();
    }

    fn delete_fast_sync_state(&self) {
        self.persisted_pivot.lock().take();
    }

    fn calculate_trailing_peer_requirements(&self) -> Option<TrailingPeerRequirements> {
        let pivot = (*self.persisted_pivot.lock())?;
        Some(TrailingPeerRequirements::new(pivot, 0))
    }
}

/// Follows the best peer one batch of blocks per tick.
///
/// With a `target` the run completes on its own once the local head gets
/// there; otherwise it runs until stopped.
pub struct SimulatedFullSync {
    sync_state: Arc<SyncState>,
    target: Option<BlockNumber>,
    stop: StopSignal,
}

impl SimulatedFullSync {
    pub fn new(sync_state: Arc<SyncState>, target: Option<BlockNumber>) -> Self {
        Self {
            sync_state,
            target,
            stop: StopSignal::new(),
        }
    }
}

impl FullSyncDownloader for SimulatedFullSync {
    fn start(&self) -> BoxFuture<'static, Result<()>> {
        let mut stop = self.stop.arm();
        let sync_state = Arc::clone(&self.sync_state);
        let target = self.target;

        async move {
            let mut interval = time::interval(TICK);
            loop {
                tokio::select! {
                    _ = stopped(&mut stop) => return Ok(()),
                    _ = interval.tick() => {
                        let local = sync_state.local_chain_height();
                        if target.is_some_and(|target| local >= target) {
                            info!(head = local.0, "Full sync reached its target");
                            return Ok(());
                        }
                        let best = sync_state.best_chain_height();
                        if local < best {
                            let next = BlockNumber((local.0 + FULL_SYNC_BLOCKS_PER_TICK).min(best.0));
                            sync_state.set_local_chain_head(next);
                        }
                    }
                }
            }
        }
        .boxed()
    }

    fn stop(&self) {
        self.stop.trigger();
    }

    fn calculate_trailing_peer_requirements(&self) -> TrailingPeerRequirements {
        TrailingPeerRequirements::new(self.sync_state.local_chain_height(), MAX_TRAILING_PEERS)
    }
}

#[derive(Debug, Default)]
pub struct SimulatedPruner {
    passes: Mutex<u64>,
    running: Mutex<bool>,
}

#[async_trait]
impl Pruner for SimulatedPruner {
    fn start(&self) {
        *self.running.lock() = true;
        info!("Pruner started");
    }

    fn stop(&self) {
        let mut running = self.running.lock();
        if *running {
            *running = false;
            *self.passes.lock() += 1;
            info!("Pruner stopped");
        }
    }

    async fn await_stop(&self) -> Result<()> {
        let passes = *self.passes.lock();
        debug!(passes, "Pruner finished");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryWorldState {
    archived: Mutex<Option<BlockHeader>>,
}

impl InMemoryWorldState {
    pub fn archived_header(&self) -> Option<BlockHeader> {
        self.archived.lock().clone()
    }
}

impl WorldStateArchive for InMemoryWorldState {
    fn set_archive_state_unsafe(&self, header: &BlockHeader) {
        info!(number = header.number.0, state_root = %header.state_root, "Adopting world state");
        *self.archived.lock() = Some(header.clone());
    }
}

/// Remote peer that knows the transactions it announced.
#[derive(Debug)]
pub struct SimulatedPeer {
    id: PeerId,
    latency: Duration,
    transactions: Mutex<HashMap<Hash, Transaction>>,
    connection_state: Mutex<ConnectionState>,
}

impl SimulatedPeer {
    pub fn new(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            id: PeerId::random(),
            latency,
            transactions: Mutex::new(HashMap::new()),
            connection_state: Mutex::new(ConnectionState::Connected),
        })
    }

    fn learn(&self, transactions: &[Transaction]) {
        let mut known = self.transactions.lock();
        for transaction in transactions {
            known.insert(transaction.hash(), transaction.clone());
        }
    }
}

impl EthPeer for SimulatedPeer {
    fn id(&self) -> PeerId {
        self.id
    }

    fn is_disconnected(&self) -> bool {
        self.connection_state.lock().is_disconnected()
    }

    fn disconnect(&self, reason: DisconnectReason) {
        info!(peer = %self.id, %reason, "Disconnecting peer");
        *self.connection_state.lock() = ConnectionState::Disconnecting;
    }

    fn get_pooled_transactions(&self, hashes: Vec<Hash>) -> BoxFuture<'static, Result<Vec<Transaction>>> {
        let response: Vec<Transaction> = {
            let known = self.transactions.lock();
            hashes
                .iter()
                .filter_map(|hash| known.get(hash).cloned())
                .collect()
        };
        let latency = self.latency;
        async move {
            time::sleep(latency).await;
            Ok(response)
        }
        .boxed()
    }
}

/// Announcement traffic produced by a set of simulated peers.
pub struct AnnouncementWorkload {
    pub peers: Vec<Arc<SimulatedPeer>>,
    pub interval: Duration,
    pub transactions_per_announcement: usize,
    /// Chance that an announced transaction is also announced by another peer.
    pub shared_ratio: f64,
    pub keep_alive: Duration,
    pub seed: u64,
}

impl AnnouncementWorkload {
    /// Announce until `stop` fires.
    pub async fn run(
        self,
        processor: Arc<NewPooledTransactionHashesProcessor>,
        mut stop: watch::Receiver<bool>,
    ) {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut interval = time::interval(self.interval);
        let mut nonce = 0u64;

        loop {
            tokio::select! {
                _ = stopped(&mut stop) => break,
                _ = interval.tick() => {}
            }
            if self.peers.is_empty() {
                continue;
            }

            let announcer = &self.peers[rng.gen_range(0..self.peers.len())];
            let transactions: Vec<Transaction> = (0..self.transactions_per_announcement)
                .map(|_| {
                    nonce += 1;
                    let payload: [u8; 16] = rng.gen();
                    Transaction::new(nonce, payload.to_vec())
                })
                .collect();
            announcer.learn(&transactions);
            let hashes: Vec<Hash> = transactions.iter().map(Transaction::hash).collect();
            announce(&processor, announcer, &hashes, self.keep_alive);

            if rng.gen_bool(self.shared_ratio.clamp(0.0, 1.0)) {
                let echo = &self.peers[rng.gen_range(0..self.peers.len())];
                echo.learn(&transactions);
                announce(&processor, echo, &hashes, self.keep_alive);
            }
        }
    }
}

fn announce(
    processor: &NewPooledTransactionHashesProcessor,
    peer: &Arc<SimulatedPeer>,
    hashes: &[Hash],
    keep_alive: Duration,
) {
    let peer: Arc<dyn EthPeer> = peer.clone();
    processor.process_new_pooled_transaction_hashes_message(
        &peer,
        &NewPooledTransactionHashesMessage::create(hashes),
        Instant::now(),
        keep_alive,
    );
}
