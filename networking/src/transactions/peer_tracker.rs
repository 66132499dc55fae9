use std::collections::HashMap;
use std::num::NonZeroUsize;

use containers::{Hash, Transaction};
use libp2p_identity::PeerId;
use lru::LruCache;
use parking_lot::Mutex;

use super::config::MAX_TRACKED_SEEN_TRANSACTIONS_PER_PEER;

/// Remembers which transactions each peer already knows about.
///
/// Marking is a set union: marking a hash twice is not an error. Each
/// peer's set is bounded and forgets its least recently marked hashes first.
#[derive(Debug)]
pub struct PeerTransactionTracker {
    seen_transactions: Mutex<HashMap<PeerId, LruCache<Hash, ()>>>,
    max_tracked_per_peer: NonZeroUsize,
}

impl PeerTransactionTracker {
    pub fn new() -> Self {
        Self::with_capacity(
            NonZeroUsize::new(MAX_TRACKED_SEEN_TRANSACTIONS_PER_PEER).unwrap_or(NonZeroUsize::MIN),
        )
    }

    pub fn with_capacity(max_tracked_per_peer: NonZeroUsize) -> Self {
        Self {
            seen_transactions: Mutex::new(HashMap::new()),
            max_tracked_per_peer,
        }
    }

    pub fn mark_transaction_hashes_as_seen(&self, peer: PeerId, hashes: &[Hash]) {
        let mut seen_transactions = self.seen_transactions.lock();
        let seen = seen_transactions
            .entry(peer)
            .or_insert_with(|| LruCache::new(self.max_tracked_per_peer));
        for hash in hashes {
            seen.put(*hash, ());
        }
    }

    pub fn mark_transactions_as_seen(&self, peer: PeerId, transactions: &[Transaction]) {
        let hashes: Vec<Hash> = transactions.iter().map(Transaction::hash).collect();
        self.mark_transaction_hashes_as_seen(peer, &hashes);
    }

    pub fn has_peer_seen_transaction(&self, peer: &PeerId, hash: &Hash) -> bool {
        self.seen_transactions
            .lock()
            .get(peer)
            .is_some_and(|seen| seen.contains(hash))
    }

    pub fn seen_transaction_count(&self, peer: &PeerId) -> usize {
        self.seen_transactions
            .lock()
            .get(peer)
            .map_or(0, LruCache::len)
    }

    /// Forget everything recorded for a peer that went away.
    pub fn on_disconnect(&self, peer: &PeerId) {
        self.seen_transactions.lock().remove(peer);
    }
}

impl Default for PeerTransactionTracker {
    fn default() -> Self {
        Self::new()
    }
}
