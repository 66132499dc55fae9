use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use chain::config::TransactionPoolConfig;
use containers::Hash;
use futures::FutureExt;
use libp2p_identity::PeerId;
use metrics::{Metrics, RunnableCounter};
use parking_lot::Mutex;
use tokio::time::Instant;
/// Announced transaction hash aggregator.
///
/// Keeps at most one pending buffer per peer. The announcement that creates
/// a buffer also schedules its flush one buffering period later; every
/// announcement until then only adds hashes to it. The flush detaches the
/// buffer before requesting, so announcements arriving during the request
/// start a new window.
use tracing::{debug, trace, warn};

use super::{
    buffered_fetcher::BufferedGetPooledTransactionsFromPeerFetcher,
    config::SKIPPED_MESSAGES_LOGGING_THRESHOLD, message::NewPooledTransactionHashesMessage,
    peer_tracker::PeerTransactionTracker, pool::TransactionPool,
};
use crate::{peers::EthPeer, scheduler::Scheduler, sync::SyncState, types::DisconnectReason};

pub struct NewPooledTransactionHashesProcessor {
    scheduled_tasks: Mutex<HashMap<PeerId, BufferedGetPooledTransactionsFromPeerFetcher>>,
    transaction_tracker: Arc<PeerTransactionTracker>,
    total_skipped_transactions_messages: RunnableCounter,
    transaction_pool: Arc<dyn TransactionPool>,
    config: TransactionPoolConfig,
    scheduler: Arc<dyn Scheduler>,
    metrics: Arc<Metrics>,
    sync_state: Arc<SyncState>,
    this: Weak<Self>,
}

impl NewPooledTransactionHashesProcessor {
    pub fn new(
        transaction_tracker: Arc<PeerTransactionTracker>,
        transaction_pool: Arc<dyn TransactionPool>,
        config: TransactionPoolConfig,
        scheduler: Arc<dyn Scheduler>,
        metrics: Arc<Metrics>,
        sync_state: Arc<SyncState>,
    ) -> Arc<Self> {
        let total_skipped_transactions_messages = RunnableCounter::new(
            metrics.skipped_transaction_messages_counter(),
            || {
                warn!(
                    "{} expired transaction messages have been skipped.",
                    SKIPPED_MESSAGES_LOGGING_THRESHOLD
                )
            },
            SKIPPED_MESSAGES_LOGGING_THRESHOLD,
        );

        Arc::new_cyclic(|this| Self {
            scheduled_tasks: Mutex::new(HashMap::new()),
            transaction_tracker,
            total_skipped_transactions_messages,
            transaction_pool,
            config,
            scheduler,
            metrics,
            sync_state,
            this: this.clone(),
        })
    }

    /// Entry point for a `NewPooledTransactionHashes` message from `peer`.
    ///
    /// `started_at` is when the message was received; it is dropped unread
    /// once `keep_alive` has passed since then.
    pub fn process_new_pooled_transaction_hashes_message(
        &self,
        peer: &Arc<dyn EthPeer>,
        message: &NewPooledTransactionHashesMessage,
        started_at: Instant,
        keep_alive: Duration,
    ) {
        match started_at.checked_add(keep_alive) {
            Some(expires_at) if expires_at > Instant::now() => {
                self.process_new_pooled_transaction_hashes(peer, message)
            }
            _ => self.total_skipped_transactions_messages.inc(),
        }
    }

    fn process_new_pooled_transaction_hashes(
        &self,
        peer: &Arc<dyn EthPeer>,
        message: &NewPooledTransactionHashesMessage,
    ) {
        let peer_id = peer.id();
        let incoming = match message.pending_transactions() {
            Ok(hashes) => hashes,
            Err(err) => {
                debug!(
                    peer = %peer_id,
                    %err,
                    "Malformed pooled transaction hashes message received, disconnecting"
                );
                self.metrics.inc_malformed_announcements();
                peer.disconnect(DisconnectReason::BreachOfProtocol);
                return;
            }
        };

        self.transaction_tracker
            .mark_transaction_hashes_as_seen(peer_id, &incoming);
        trace!(
            peer = %peer_id,
            incoming = incoming.len(),
            hashes = ?incoming,
            "Received pooled transaction hashes message"
        );

        if !self
            .sync_state
            .is_in_sync_with_tolerance(self.config.sync_tolerance)
        {
            trace!(peer = %peer_id, "Not in sync, ignoring announced transactions");
            return;
        }

        let (missing, pooled): (Vec<Hash>, Vec<Hash>) = incoming
            .into_iter()
            .partition(|hash| self.transaction_pool.get_transaction_by_hash(hash).is_none());
        if !pooled.is_empty() {
            self.metrics.inc_announced_hashes_already_pooled(pooled.len());
        }
        if missing.is_empty() {
            return;
        }

        let opened_window = {
            let mut scheduled_tasks = self.scheduled_tasks.lock();
            let mut opened_window = false;
            let fetcher = scheduled_tasks.entry(peer_id).or_insert_with(|| {
                opened_window = true;
                BufferedGetPooledTransactionsFromPeerFetcher::new(Arc::clone(peer))
            });
            for hash in missing {
                fetcher.add_hash(hash);
            }
            opened_window
        };

        // Only the flush scheduled here removes the buffer, so scheduling can
        // happen outside the lock.
        if opened_window {
            self.schedule_fetch(peer_id);
        }
    }

    fn schedule_fetch(&self, peer_id: PeerId) {
        let processor = self.this.clone();
        self.scheduler.schedule_future_task(
            async move {
                if let Some(processor) = processor.upgrade() {
                    processor.fetch_buffered_transactions(peer_id).await;
                }
            }
            .boxed(),
            self.config.announced_buffering_period,
        );
    }

    async fn fetch_buffered_transactions(&self, peer_id: PeerId) {
        let fetcher = self.scheduled_tasks.lock().remove(&peer_id);
        let Some(fetcher) = fetcher else {
            return;
        };
        if fetcher.peer().is_disconnected() {
            debug!(
                peer = %peer_id,
                dropped = fetcher.len(),
                "Peer disconnected, dropping buffered transaction hashes"
            );
            return;
        }
        fetcher.request_transactions(self).await;
    }

    /// Forget the transactions a departed peer was known to have.
    pub fn on_peer_disconnected(&self, peer_id: &PeerId) {
        self.transaction_tracker.on_disconnect(peer_id);
    }

    pub fn transaction_pool(&self) -> &Arc<dyn TransactionPool> {
        &self.transaction_pool
    }

    pub fn transaction_tracker(&self) -> &Arc<PeerTransactionTracker> {
        &self.transaction_tracker
    }

    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.scheduler
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Expired messages skipped since creation.
    pub fn skipped_messages(&self) -> u64 {
        self.total_skipped_transactions_messages.get()
    }

    /// Peers with a buffering window currently open.
    pub fn pending_peers(&self) -> usize {
        self.scheduled_tasks.lock().len()
    }

    /// Hashes waiting in `peer_id`'s open window, if any.
    pub fn buffered_hashes(&self, peer_id: &PeerId) -> Option<usize> {
        self.scheduled_tasks.lock().get(peer_id).map(|fetcher| fetcher.len())
    }
}
